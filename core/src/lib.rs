//! Synchronous client for the WeCom group-bot webhook API.
//!
//! # Overview
//! A `Bot` encodes message values, posts them to
//! `/cgi-bin/webhook/send?key=...` and turns the `{errcode, errmsg}` reply
//! into `Ok(())` or a typed `BotError`. Media for file and voice messages
//! goes through `/cgi-bin/webhook/upload_media` as a single-part
//! `multipart/form-data` body and comes back as a `media_id`.
//!
//! # Design
//! - Transport and codec are traits injected at construction; `UreqTransport`
//!   and `JsonCodec` are the defaults.
//! - `ConcurrencyMode::Exclusive` reuses one request/response buffer pair per
//!   bot, `ConcurrencyMode::Shared` allocates per call. Either way the bot is
//!   `Sync`; exclusive bots queue concurrent callers on the buffer lock.
//! - Failures split into transport, codec and remote classes, see `BotError`.
//! - No retries, no rate limiting. Callers wrap calls if they need either.
//!
//! ```no_run
//! use wecom_bot_core::{Article, Bot, MediaKind};
//!
//! # fn main() -> Result<(), wecom_bot_core::BotError> {
//! let bot = Bot::new("693a91f6-7xxx-4bc4-97a0-0ec2sifa5aaa");
//! bot.send_text("deploy finished")?;
//! bot.send_news(vec![Article::new("Release notes", "https://example.com/notes")])?;
//!
//! let media = bot.upload_media_bytes(MediaKind::File, b"report body", "report.txt")?;
//! bot.send_message(&wecom_bot_core::Message::file(media.media_id))?;
//! # Ok(())
//! # }
//! ```

pub mod bot;
pub mod codec;
pub mod config;
mod dispatch;
pub mod envelope;
pub mod error;
pub mod http;
pub mod key;
pub mod message;
mod multipart;
mod scratch;
pub mod template_card;

#[cfg(test)]
mod testing;

pub use bot::{Bot, BotBuilder, MediaKind, DEFAULT_BASE_URL};
pub use codec::{Codec, JsonCodec};
pub use config::BotConfig;
pub use envelope::{Envelope, UploadedMedia};
pub use error::{BotError, CodecError, RemoteError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use key::extract_key;
pub use message::{Article, ImageContent, MarkdownContent, MediaContent, Message, NewsContent, TextContent};
pub use scratch::ConcurrencyMode;
pub use template_card::TemplateCard;
