pub mod console;

#[cfg(feature = "x11")]
pub mod x11;
