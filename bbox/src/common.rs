pub use anyhow::{ensure, Result};
pub use num_traits::{Num, NumCast, One, ToPrimitive, Zero};
#[cfg(feature = "serde")]
pub use serde::{Deserialize, Serialize};
pub use std::ops::Mul;
