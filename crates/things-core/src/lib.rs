#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod cache;
mod channels;
mod error;
mod page;
mod repository;
mod thing;

pub use cache::ThingCache;
pub use channels::ChannelConnections;
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use page::{MAX_LIMIT, Page, PageQuery};
pub use repository::ThingRepository;
pub use thing::{Metadata, Thing};
