//! CMS Envelope Protocol Types
//!
//! This crate contains the wire format of the envelope:
//! - A minimal DER codec ([`asn1::Asn1Writer`], [`asn1::Asn1Reader`])
//! - CMS structures for content info, enveloped data and recipients
//! - [`CustomParams`], a typed key/value side channel
//!
//! This crate contains NO cryptographic operations and NO I/O.
//! It is purely focused on data structures and serialization.

pub mod algorithm;
pub mod asn1;
pub mod cms;
pub mod custom_params;

// Re-export commonly used types
pub use algorithm::AlgorithmIdentifier;
pub use asn1::{Asn1Compatible, Asn1Error, Asn1Reader, Asn1Writer, Oid};
pub use cms::{
    CmsContent, CmsError, ContentInfo, ContentType, EncryptedContent, EnvelopedData,
    KeyTransRecipient, PasswordRecipient, RecipientInfo,
};
pub use custom_params::CustomParams;
