pub mod bigint;
pub mod modulus;
pub mod ntt;
pub mod poly;
pub mod primes;
pub mod ring;

pub use modulus::barrett::{Barrett, BarrettPrecomp};
pub use modulus::prime::{is_prime, Prime};
pub use ntt::NttTable;
pub use poly::{Poly, RnsPoly};
pub use ring::RnsRing;
