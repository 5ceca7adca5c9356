use std::fmt;

use num_bigint::BigUint;

use serde::{
	ser::{Serialize, Serializer, SerializeSeq},
	de::{Deserialize, Deserializer, SeqAccess, Visitor},
};


/// A point on the identifier ring. The value is always reduced by the
/// [`IdentifierSpace`](crate::id_space::IdentifierSpace) that produced it,
/// so two ids from the same space compare by ring position directly.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Default)]
pub struct CircularId{
	id: BigUint,
}

impl CircularId{
	pub fn new(id: BigUint) -> CircularId{
		CircularId{id}
	}

	/// Parse a base 10 id, as typed by an operator.
	pub fn parse(data: &str) -> Option<CircularId>{
		BigUint::parse_bytes(data.as_bytes(), 10).map(CircularId::new)
	}

	pub fn from_vec(vec: Vec<u32>) -> CircularId{
		CircularId{id: BigUint::new(vec)}
	}

	pub fn zero() -> CircularId{
		CircularId{id: BigUint::new(vec!(0))}
	}

	pub fn as_biguint(&self) -> &BigUint{
		&self.id
	}

	pub fn into_biguint(self) -> BigUint{
		self.id
	}
}

impl From<u32> for CircularId{
	fn from(arg: u32) -> CircularId{
		CircularId::from_vec(vec!(arg))
	}
}

impl From<u64> for CircularId{
	fn from(arg: u64) -> CircularId{
		CircularId::new(BigUint::from(arg))
	}
}

impl fmt::Display for CircularId{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result{
		write!(f, "{}", self.id)
	}
}

impl fmt::Debug for CircularId{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result{
		write!(f, "{}", self.id)
	}
}

impl Serialize for CircularId {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let v = self.id.to_u32_digits();
		let mut seq = serializer.serialize_seq(Some(v.len()))?;
		for e in v {
			seq.serialize_element(&e)?;
		}
		seq.end()
	}
}


struct CircularIdVisitor;

impl<'de> Visitor<'de> for CircularIdVisitor {
	type Value = CircularId;

	fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
		formatter.write_str("Circular Id from an array of u32, least significant first")
	}

	fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
		where
			S: SeqAccess<'de>
		{
			let mut v = Vec::with_capacity(seq.size_hint().unwrap_or(0));
			while let Some(element) = seq.next_element()? {
				v.push(element);
			}
			Ok(CircularId::from_vec(v))
	}
}

impl<'de> Deserialize<'de> for CircularId {
	fn deserialize<D>(deserializer: D) -> Result<CircularId, D::Error>
	where
		D: Deserializer<'de>,
	{
		deserializer.deserialize_seq(CircularIdVisitor)
	}
}
