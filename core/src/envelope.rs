//! Response envelopes returned by the webhook service.
//!
//! Every response carries `{errcode, errmsg}`. Upload responses embed the
//! same envelope and add the media reference, so `UploadedMedia` composes an
//! `Envelope` through `#[serde(flatten)]` instead of repeating its fields.

use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl Envelope {
    /// Only an exact zero is success; negative codes are failures too.
    pub fn is_success(&self) -> bool {
        self.errcode == 0
    }

    pub fn check(&self) -> Result<(), RemoteError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(RemoteError::new(self.errcode, self.errmsg.clone()))
        }
    }
}

/// Result of a media upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMedia {
    #[serde(flatten)]
    pub envelope: Envelope,
    /// Opaque id consumed by a subsequent file or voice message.
    #[serde(default)]
    pub media_id: String,
    #[serde(default)]
    pub created_at: String,
}

impl UploadedMedia {
    pub fn check(&self) -> Result<(), RemoteError> {
        self.envelope.check()
    }
}
