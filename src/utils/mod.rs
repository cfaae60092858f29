mod buf;
mod seq;

pub use buf::*;
pub use seq::*;
