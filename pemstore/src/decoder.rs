//! Decoder trait for type-safe conversions.
//!
//! The `Decoder` trait converts a source type `T` into a destination type
//! `D`. The destination must opt in through the `DecodableFrom<T>` marker,
//! so only conversions that were explicitly written can be requested.
//!
//! ```no_run
//! use pemstore::decoder::{DecodableFrom, Decoder};
//!
//! struct Armored(String);
//! struct Payload(Vec<u8>);
//!
//! #[derive(Debug)]
//! struct BadArmor;
//!
//! impl DecodableFrom<Armored> for Payload {}
//!
//! impl Decoder<Armored, Payload> for Armored {
//!     type Error = BadArmor;
//!
//!     fn decode(&self) -> Result<Payload, Self::Error> {
//!         Ok(Payload(self.0.as_bytes().to_vec()))
//!     }
//! }
//! ```

/// Decoder trait for converting from type `T` to type `D`.
///
/// Implemented by the source type. `D` must implement `DecodableFrom<T>`.
pub trait Decoder<T, D: DecodableFrom<T>> {
    /// The error type returned when decoding fails.
    type Error;

    /// Decodes `self` into type `D`.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversion fails. The specific error
    /// conditions depend on the implementing type.
    fn decode(&self) -> Result<D, Self::Error>;
}

/// Marker trait indicating that type `D` can be decoded from type `T`.
///
/// It has no methods; it only constrains [`Decoder`] so that the compiler
/// rejects conversions nobody implemented.
pub trait DecodableFrom<T> {}
