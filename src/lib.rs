#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use jot_contracts as contracts;
pub use jot_engine as engine;
pub use jot_tokens as tokens;
