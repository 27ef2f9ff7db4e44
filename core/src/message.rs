//! Message payloads accepted by the webhook `send` endpoint.
//!
//! `Message` is internally tagged by `msgtype`, so every variant serializes
//! as `{"msgtype": "<kind>", "<kind>": {...}}`. Length limits and other
//! field constraints are enforced by the service, not here.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::template_card::TemplateCard;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msgtype", rename_all = "snake_case")]
pub enum Message {
    Text { text: TextContent },
    Markdown { markdown: MarkdownContent },
    Image { image: ImageContent },
    News { news: NewsContent },
    File { file: MediaContent },
    Voice { voice: MediaContent },
    TemplateCard { template_card: TemplateCard },
}

impl Message {
    pub fn text(content: impl Into<String>) -> Self {
        Message::Text {
            text: TextContent::new(content),
        }
    }

    pub fn markdown(content: impl Into<String>) -> Self {
        Message::Markdown {
            markdown: MarkdownContent {
                content: content.into(),
            },
        }
    }

    pub fn image(data: &[u8]) -> Self {
        Message::Image {
            image: ImageContent::from_bytes(data),
        }
    }

    pub fn news(articles: Vec<Article>) -> Self {
        Message::News {
            news: NewsContent { articles },
        }
    }

    pub fn file(media_id: impl Into<String>) -> Self {
        Message::File {
            file: MediaContent::new(media_id),
        }
    }

    pub fn voice(media_id: impl Into<String>) -> Self {
        Message::Voice {
            voice: MediaContent::new(media_id),
        }
    }

    pub fn template_card(card: TemplateCard) -> Self {
        Message::TemplateCard {
            template_card: card,
        }
    }

    /// The `msgtype` discriminator this message serializes with.
    pub fn msg_type(&self) -> &'static str {
        match self {
            Message::Text { .. } => "text",
            Message::Markdown { .. } => "markdown",
            Message::Image { .. } => "image",
            Message::News { .. } => "news",
            Message::File { .. } => "file",
            Message::Voice { .. } => "voice",
            Message::TemplateCard { .. } => "template_card",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    /// At most 2048 bytes of UTF-8.
    pub content: String,
    /// User ids to mention; `@all` mentions everyone.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentioned_list: Vec<String>,
    /// Mobile numbers to mention; `@all` mentions everyone.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentioned_mobile_list: Vec<String>,
}

impl TextContent {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn mention<I, S>(mut self, user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mentioned_list.extend(user_ids.into_iter().map(Into::into));
        self
    }

    pub fn mention_mobiles<I, S>(mut self, mobiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mentioned_mobile_list
            .extend(mobiles.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownContent {
    /// At most 4096 bytes of UTF-8.
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Standard base64 of the raw image.
    pub base64: String,
    /// Lowercase hex MD5 of the raw image, before base64.
    pub md5: String,
}

impl ImageContent {
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            base64: STANDARD.encode(data),
            md5: format!("{:x}", Md5::digest(data)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsContent {
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Truncated by the service past 128 bytes.
    pub title: String,
    /// Truncated by the service past 512 bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
    #[serde(rename = "picurl", default, skip_serializing_if = "Option::is_none")]
    pub pic_url: Option<String>,
}

impl Article {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn pic_url(mut self, pic_url: impl Into<String>) -> Self {
        self.pic_url = Some(pic_url.into());
        self
    }
}

/// Body of a file or voice message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaContent {
    /// Id returned by a prior media upload.
    pub media_id: String,
}

impl MediaContent {
    pub fn new(media_id: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn text_serializes_with_discriminator() {
        let msg = Message::Text {
            text: TextContent::new("hello").mention(["@all"]),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"msgtype": "text", "text": {"content": "hello", "mentioned_list": ["@all"]}})
        );
    }

    #[test]
    fn empty_mention_lists_are_omitted() {
        let value = serde_json::to_value(Message::text("plain")).unwrap();
        assert!(value["text"].get("mentioned_list").is_none());
        assert!(value["text"].get("mentioned_mobile_list").is_none());
    }

    #[test]
    fn image_carries_base64_and_md5() {
        let msg = Message::image(b"hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["msgtype"], "image");
        assert_eq!(value["image"]["base64"], "aGVsbG8=");
        assert_eq!(value["image"]["md5"], "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn news_article_uses_picurl_key() {
        let msg = Message::news(vec![Article::new("Title", "https://example.com")
            .pic_url("https://example.com/p.png")]);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["news"]["articles"][0]["picurl"], "https://example.com/p.png");
        assert!(value["news"]["articles"][0].get("description").is_none());
    }

    #[test]
    fn file_and_voice_carry_media_id() {
        assert_eq!(
            serde_json::to_value(Message::file("M1")).unwrap(),
            json!({"msgtype": "file", "file": {"media_id": "M1"}})
        );
        assert_eq!(
            serde_json::to_value(Message::voice("V1")).unwrap(),
            json!({"msgtype": "voice", "voice": {"media_id": "V1"}})
        );
    }

    #[test]
    fn msg_type_matches_serialized_tag() {
        let messages = [
            Message::text("a"),
            Message::markdown("**b**"),
            Message::image(b"c"),
            Message::news(Vec::new()),
            Message::file("d"),
            Message::voice("e"),
        ];
        for msg in messages {
            let value = serde_json::to_value(&msg).unwrap();
            assert_eq!(value["msgtype"], msg.msg_type());
        }
    }

    #[test]
    fn message_parses_back_from_wire_form() {
        let msg: Message =
            serde_json::from_value(json!({"msgtype": "markdown", "markdown": {"content": "# hi"}}))
                .unwrap();
        assert_eq!(msg, Message::markdown("# hi"));
    }
}
