// Strng provides a cheaply-clonable string for items we expect to be highly duplicated,
// such as object names and namespaces. The translation pipeline clones names into many
// derived artifacts, so reference counting beats re-allocating each time.
pub use arcstr::format;
pub use arcstr::literal;

pub type Strng = arcstr::ArcStr;

pub fn new<A: AsRef<str>>(s: A) -> Strng {
	arcstr::ArcStr::from(s.as_ref())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new_is_cheap_to_clone() {
		let a = new("gateway/default/example");
		let b = a.clone();
		assert_eq!(a, b);
		assert_eq!(a.as_str(), "gateway/default/example");
	}

	#[test]
	fn test_format() {
		let ns = new("default");
		let name = new("jwt-policy");
		assert_eq!(super::format!("{ns}/{name}").as_str(), "default/jwt-policy");
	}
}
