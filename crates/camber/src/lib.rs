#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use camber_image as image;

#[doc(inline)]
pub use camber_io as io;

#[doc(inline)]
pub use camber_calib as calib;

#[doc(inline)]
pub use camber_planar as planar;

#[doc(inline)]
pub use camber_msg as msg;
