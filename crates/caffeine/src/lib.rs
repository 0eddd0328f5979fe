#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use caffeine_tensor as tensor;

#[doc(inline)]
pub use caffeine_nn as nn;
