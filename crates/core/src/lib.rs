pub mod durfmt;
pub mod strng;

pub mod prelude {
	pub use std::sync::Arc;
	pub use std::time::Duration;

	pub use itertools::Itertools;
	pub use tracing::{debug, error, info, trace, warn};

	pub use crate::strng;
	pub use crate::strng::Strng;
}
