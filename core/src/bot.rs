//! The webhook bot: message sending and media upload.
//!
//! # Design
//! `Bot` binds one webhook key to a transport, a codec and a scratch space.
//! Both public pipelines run the same three steps: encode into the request
//! buffer, `dispatch::post` into the response buffer, then inspect the
//! envelope. The buffers come from a `Lease`, which in `Exclusive` mode is
//! the bot's single pooled pair and in `Shared` mode a fresh pair, and which
//! resets the pooled pair when the call returns by any path.
//!
//! The key is part of every URL the bot builds but never appears in its
//! `Debug` output or in log events.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::codec::{Codec, JsonCodec};
use crate::dispatch;
use crate::envelope::{Envelope, UploadedMedia};
use crate::error::BotError;
use crate::http::{Transport, UreqTransport};
use crate::key::extract_key;
use crate::message::{Article, ImageContent, Message, TextContent};
use crate::multipart::MultipartWriter;
use crate::scratch::{ConcurrencyMode, Scratch, ScratchSpace};
use crate::template_card::TemplateCard;

pub const DEFAULT_BASE_URL: &str = "https://qyapi.weixin.qq.com";

const SEND_PATH: &str = "/cgi-bin/webhook/send";
const UPLOAD_PATH: &str = "/cgi-bin/webhook/upload_media";
const JSON_HEADERS: &[(&str, &str)] = &[("Content-Type", "application/json")];
const MEDIA_FIELD: &str = "media";
const OCTET_STREAM: &str = "application/octet-stream";

/// Media kind accepted by the upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Any file, at most 20MB.
    File,
    /// AMR audio, at most 2MB and 60 seconds.
    Voice,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::File => "file",
            MediaKind::Voice => "voice",
        }
    }
}

/// Split a full webhook URL into its key and its `scheme://host[:port]`.
pub(crate) fn split_webhook_url(webhook_url: &str) -> Result<(String, String), BotError> {
    let url = Url::parse(webhook_url)
        .map_err(|err| BotError::Config(format!("invalid webhook url: {err}")))?;
    let key = extract_key(webhook_url);
    if key.is_empty() {
        return Err(BotError::Config("webhook url has no key parameter".to_string()));
    }
    Ok((key, url.origin().ascii_serialization()))
}

/// Named, independently defaulted options for a `Bot`.
///
/// Defaults: `Exclusive` concurrency, `UreqTransport`, `JsonCodec`,
/// `DEFAULT_BASE_URL`.
pub struct BotBuilder<C = JsonCodec> {
    key: String,
    base_url: String,
    concurrency: ConcurrencyMode,
    transport: Option<Arc<dyn Transport>>,
    codec: C,
}

impl BotBuilder<JsonCodec> {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            concurrency: ConcurrencyMode::default(),
            transport: None,
            codec: JsonCodec,
        }
    }

    /// Take the key and host from a full webhook URL such as
    /// `https://qyapi.weixin.qq.com/cgi-bin/webhook/send?key=...`.
    pub fn from_webhook_url(webhook_url: &str) -> Result<Self, BotError> {
        let (key, base_url) = split_webhook_url(webhook_url)?;
        Ok(Self::new(key).base_url(base_url))
    }
}

impl<C: Codec> BotBuilder<C> {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency = mode;
        self
    }

    /// Shorthand for `concurrency(ConcurrencyMode::Shared)`.
    pub fn thread_safe(self) -> Self {
        self.concurrency(ConcurrencyMode::Shared)
    }

    pub fn transport(self, transport: impl Transport + 'static) -> Self {
        self.shared_transport(Arc::new(transport))
    }

    /// Use a transport that is also held elsewhere, e.g. by other bots.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn codec<D: Codec>(self, codec: D) -> BotBuilder<D> {
        BotBuilder {
            key: self.key,
            base_url: self.base_url,
            concurrency: self.concurrency,
            transport: self.transport,
            codec,
        }
    }

    pub fn build(self) -> Bot<C> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        let encoded_key: String = url::form_urlencoded::byte_serialize(self.key.as_bytes()).collect();
        let webhook_url = format!("{base_url}{SEND_PATH}?key={encoded_key}");
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new()));

        debug!(base_url = %base_url, mode = ?self.concurrency, "building webhook bot");
        Bot {
            key: self.key,
            encoded_key,
            base_url,
            webhook_url,
            scratch: ScratchSpace::new(self.concurrency),
            transport,
            codec: self.codec,
        }
    }
}

/// Client for one webhook key.
///
/// In `Exclusive` mode (the default) every call reuses the same two buffers
/// and calls on one bot run one at a time. Build with `thread_safe()` to let
/// threads share a bot without queueing, at the cost of one allocation pair
/// per call.
pub struct Bot<C = JsonCodec> {
    key: String,
    encoded_key: String,
    base_url: String,
    webhook_url: String,
    scratch: ScratchSpace,
    transport: Arc<dyn Transport>,
    codec: C,
}

impl Bot<JsonCodec> {
    /// A bot for `key` with every option at its default.
    pub fn new(key: impl Into<String>) -> Self {
        BotBuilder::new(key).build()
    }

    pub fn builder(key: impl Into<String>) -> BotBuilder {
        BotBuilder::new(key)
    }

    pub fn from_webhook_url(webhook_url: &str) -> Result<Self, BotError> {
        Ok(BotBuilder::from_webhook_url(webhook_url)?.build())
    }
}

impl<C: Codec> Bot<C> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    pub fn concurrency_mode(&self) -> ConcurrencyMode {
        self.scratch.mode()
    }

    pub fn upload_url(&self, kind: MediaKind) -> String {
        format!(
            "{}{UPLOAD_PATH}?key={}&type={}",
            self.base_url,
            self.encoded_key,
            kind.as_str()
        )
    }

    /// Encode `message` and post it to the webhook.
    ///
    /// `message` must serialize to an object carrying its own `msgtype`;
    /// it is not inspected here.
    pub fn send<M: Serialize + ?Sized>(&self, message: &M) -> Result<(), BotError> {
        let mut lease = self.scratch.lease();
        let Scratch { request, response } = &mut *lease;

        self.codec.encode(message, request).map_err(BotError::Encode)?;
        debug!(bytes = request.len(), "posting webhook message");

        let envelope: Envelope = dispatch::post(
            &*self.transport,
            &self.codec,
            &self.webhook_url,
            JSON_HEADERS,
            request,
            response,
        )?;
        envelope.check().map_err(|err| {
            warn!(code = err.code(), errmsg = err.message(), "webhook rejected message");
            BotError::Remote(err)
        })
    }

    pub fn send_message(&self, message: &Message) -> Result<(), BotError> {
        debug!(msgtype = message.msg_type(), "sending message");
        self.send(message)
    }

    pub fn send_text(&self, content: impl Into<String>) -> Result<(), BotError> {
        self.send_text_content(TextContent::new(content))
    }

    /// Send a text message with mentions already filled in.
    pub fn send_text_content(&self, text: TextContent) -> Result<(), BotError> {
        self.send_message(&Message::Text { text })
    }

    pub fn send_markdown(&self, content: impl Into<String>) -> Result<(), BotError> {
        self.send_message(&Message::markdown(content))
    }

    /// Read an image to the end and send it inline (base64 plus MD5).
    pub fn send_image(&self, mut image: impl Read) -> Result<(), BotError> {
        let mut data = Vec::new();
        image.read_to_end(&mut data).map_err(BotError::Io)?;
        self.send_image_bytes(&data)
    }

    pub fn send_image_bytes(&self, data: &[u8]) -> Result<(), BotError> {
        self.send_message(&Message::Image {
            image: ImageContent::from_bytes(data),
        })
    }

    pub fn send_news(&self, articles: Vec<Article>) -> Result<(), BotError> {
        self.send_message(&Message::news(articles))
    }

    pub fn send_template_card(&self, card: TemplateCard) -> Result<(), BotError> {
        self.send_message(&Message::template_card(card))
    }

    /// Upload `data` as a file and send a file message referencing it.
    pub fn send_file(&self, data: impl Read, filename: &str, length: u64) -> Result<(), BotError> {
        let media = self.upload_media(MediaKind::File, data, filename, length)?;
        self.send_message(&Message::file(media.media_id))
    }

    /// Upload `data` as a voice clip and send a voice message referencing it.
    pub fn send_voice(&self, data: impl Read, filename: &str, length: u64) -> Result<(), BotError> {
        let media = self.upload_media(MediaKind::Voice, data, filename, length)?;
        self.send_message(&Message::voice(media.media_id))
    }

    /// Upload one media part and return its reference.
    ///
    /// `filename` and `length` are sent as declared; `length` is not checked
    /// against the bytes read from `data`.
    pub fn upload_media(
        &self,
        kind: MediaKind,
        data: impl Read,
        filename: &str,
        length: u64,
    ) -> Result<UploadedMedia, BotError> {
        let mut lease = self.scratch.lease();
        let Scratch { request, response } = &mut *lease;

        let mut form = MultipartWriter::new(request);
        let copied = form
            .write_file_part(MEDIA_FIELD, filename, length, OCTET_STREAM, data)
            .map_err(BotError::Io)?;
        debug!(
            kind = kind.as_str(),
            boundary = form.boundary(),
            bytes = copied,
            "encoded media upload"
        );
        let content_type = form.finish();

        let url = self.upload_url(kind);
        let headers = [("Content-Type", content_type.as_str())];
        let media: UploadedMedia = dispatch::post(
            &*self.transport,
            &self.codec,
            &url,
            &headers,
            request,
            response,
        )?;

        if let Err(err) = media.check() {
            warn!(code = err.code(), errmsg = err.message(), "media upload rejected");
            return Err(BotError::Remote(err));
        }
        Ok(media)
    }

    pub fn upload_media_bytes(
        &self,
        kind: MediaKind,
        data: &[u8],
        filename: &str,
    ) -> Result<UploadedMedia, BotError> {
        self.upload_media(kind, data, filename, data.len() as u64)
    }
}

impl<C> fmt::Debug for Bot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("base_url", &self.base_url)
            .field("key", &"<redacted>")
            .field("mode", &self.scratch.mode())
            .finish_non_exhaustive()
    }
}
