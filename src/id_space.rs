//! Positions on the ring and the circular intervals between them.
//!
//! Every node and every key is placed on a ring of `2^m` identifiers by
//! hashing it with SHA-1 and reducing the digest modulo `2^m`. All interval
//! tests walk the ring clockwise from the left bound to the right bound.
//!
//! An interval whose bounds are equal is a full turn of the ring. The bound
//! flags then only decide whether that single point belongs to it, so `(a, a)`
//! is every identifier except `a` while `(a, a]`, `[a, a)` and `[a, a]` are the
//! whole ring. A node that is its own successor therefore owns every key, and
//! every other node lies strictly between it and itself.

use num_bigint::{BigUint, RandBigInt};
use sha1::{Digest, Sha1};

use crate::circular_id::CircularId;
use crate::error::{Error, Result};

/// Width of a SHA-1 digest, the widest ring an identifier can address.
pub const MAX_RING_BITS: u32 = 160;

/// Which ends of an interval are part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
	pub include_left: bool,
	pub include_right: bool,
}

impl Bounds {
	pub const OPEN: Bounds = Bounds { include_left: false, include_right: false };
	pub const CLOSED_LEFT: Bounds = Bounds { include_left: true, include_right: false };
	pub const CLOSED_RIGHT: Bounds = Bounds { include_left: false, include_right: true };
	pub const CLOSED: Bounds = Bounds { include_left: true, include_right: true };
}

/// The identifier ring `[0, 2^bits)`. All nodes of one network must share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierSpace {
	bits: u32,
	modulus: BigUint,
}

impl IdentifierSpace {
	pub fn new(bits: u32) -> Result<Self> {
		if bits == 0 || bits > MAX_RING_BITS {
			return Err(Error::Config(format!(
				"ring_bits must be within 1..={}, got {}",
				MAX_RING_BITS, bits
			)));
		}
		Ok(Self {
			bits,
			modulus: BigUint::from(1u8) << bits,
		})
	}

	pub fn bits(&self) -> u32 {
		self.bits
	}

	pub fn modulus(&self) -> &BigUint {
		&self.modulus
	}

	/// Hash an address or a key onto the ring.
	pub fn hash(&self, bytes: &[u8]) -> CircularId {
		let digest = Sha1::digest(bytes);
		self.reduce(BigUint::from_bytes_be(&digest))
	}

	pub fn reduce(&self, value: BigUint) -> CircularId {
		CircularId::new(value % &self.modulus)
	}

	/// Convenience for small rings and tests.
	pub fn id(&self, value: u64) -> CircularId {
		self.reduce(BigUint::from(value))
	}

	pub fn random(&self) -> CircularId {
		let mut rng = rand::thread_rng();
		CircularId::new(rng.gen_biguint_below(&self.modulus))
	}

	/// `(id + 2^index) mod 2^m`, the start of finger `index`.
	pub fn finger_start(&self, id: &CircularId, index: u32) -> CircularId {
		self.reduce(id.as_biguint() + (BigUint::from(1u8) << index))
	}

	/// `(id - 2^index + 1) mod 2^m`: the identifier whose predecessor may need
	/// `id` as its finger `index`.
	pub fn update_target(&self, id: &CircularId, index: u32) -> CircularId {
		let back = BigUint::from(1u8) << index;
		self.reduce(id.as_biguint() + &self.modulus + 1u8 - back)
	}

	/// Clockwise distance travelled from `from` to reach `to`.
	pub fn distance(&self, from: &CircularId, to: &CircularId) -> BigUint {
		(to.as_biguint() + &self.modulus - (from.as_biguint() % &self.modulus)) % &self.modulus
	}

	pub fn in_interval(&self, x: &CircularId, a: &CircularId, b: &CircularId, bounds: Bounds) -> bool {
		let to_x = self.distance(a, x);
		let full_turn = a == b;
		let to_b = if full_turn { self.modulus.clone() } else { self.distance(a, b) };

		if to_x == BigUint::default() {
			// x sits on the left bound, which is also the right bound after a full turn
			return bounds.include_left || (full_turn && bounds.include_right);
		}
		if to_x < to_b {
			return true;
		}
		to_x == to_b && bounds.include_right
	}

	/// `x ∈ (a, b)`
	pub fn in_open(&self, x: &CircularId, a: &CircularId, b: &CircularId) -> bool {
		self.in_interval(x, a, b, Bounds::OPEN)
	}

	/// `x ∈ [a, b)`
	pub fn in_closed_left(&self, x: &CircularId, a: &CircularId, b: &CircularId) -> bool {
		self.in_interval(x, a, b, Bounds::CLOSED_LEFT)
	}

	/// `x ∈ (a, b]`
	pub fn in_closed_right(&self, x: &CircularId, a: &CircularId, b: &CircularId) -> bool {
		self.in_interval(x, a, b, Bounds::CLOSED_RIGHT)
	}
}
