use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use super::{
    messages::{ClientMessage, ServerMessage},
    opcodes::{client, server},
};
use crate::{catalog::CatalogEntry, common::types::ItemId, playback::PlayState};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message is not a non-empty array")]
    NotATuple,
    #[error("message tag is not a string")]
    BadTag,
    #[error("unknown tag {0:?}")]
    UnknownTag(String),
    #[error("tag {tag:?} expects {expected} payload elements, got {got}")]
    Arity {
        tag: String,
        expected: usize,
        got: usize,
    },
    #[error("tag {tag:?} has an invalid {field}")]
    InvalidField { tag: String, field: &'static str },
}

/// A decoded `[tag, ...payload]` frame.
struct Tuple<'a> {
    tag: &'a str,
    payload: &'a [Value],
}

impl<'a> Tuple<'a> {
    fn parse(value: &'a Value) -> Result<Self, DecodeError> {
        let items = value.as_array().ok_or(DecodeError::NotATuple)?;
        let (tag, payload) = items.split_first().ok_or(DecodeError::NotATuple)?;
        let tag = tag.as_str().ok_or(DecodeError::BadTag)?;
        Ok(Self { tag, payload })
    }

    fn arity(&self, expected: usize) -> Result<&'a [Value], DecodeError> {
        if self.payload.len() != expected {
            return Err(DecodeError::Arity {
                tag: self.tag.to_string(),
                expected,
                got: self.payload.len(),
            });
        }
        Ok(self.payload)
    }

    fn invalid(&self, field: &'static str) -> DecodeError {
        DecodeError::InvalidField {
            tag: self.tag.to_string(),
            field,
        }
    }

    fn id(&self, value: &Value, field: &'static str) -> Result<ItemId, DecodeError> {
        value
            .as_str()
            .and_then(ItemId::parse)
            .ok_or_else(|| self.invalid(field))
    }

    fn ids(&self, value: &Value) -> Result<Vec<ItemId>, DecodeError> {
        value
            .as_array()
            .ok_or_else(|| self.invalid("id list"))?
            .iter()
            .map(|v| self.id(v, "id list"))
            .collect()
    }

    /// Like `ids`, but a string that is not a valid id is skipped rather
    /// than failing the frame. It can never name a catalog entry.
    fn submitted_ids(&self, value: &Value) -> Result<Vec<ItemId>, DecodeError> {
        let items = value.as_array().ok_or_else(|| self.invalid("id list"))?;
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let raw = item.as_str().ok_or_else(|| self.invalid("id list"))?;
            match ItemId::parse(raw) {
                Some(id) => ids.push(id),
                None => warn!("Skipping invalid id {:?} in {:?}", raw, self.tag),
            }
        }
        Ok(ids)
    }

    fn number(&self, value: &Value, field: &'static str) -> Result<f64, DecodeError> {
        value
            .as_f64()
            .filter(|n| n.is_finite())
            .ok_or_else(|| self.invalid(field))
    }

    fn discriminator(&self, value: &Value) -> Result<u32, DecodeError> {
        value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| self.invalid("discriminator"))
    }

    fn play_state(&self, value: &Value) -> Result<PlayState, DecodeError> {
        let state = PlayState::deserialize(value).map_err(|_| self.invalid("play state"))?;
        let (time, rate) = match state {
            PlayState::Playing { time_start, rate } => (time_start, rate),
            PlayState::Paused { time_at, rate } => (time_at, rate),
        };
        if time.is_finite() && rate.is_finite() {
            Ok(state)
        } else {
            Err(self.invalid("play state"))
        }
    }

    fn unknown(&self) -> DecodeError {
        DecodeError::UnknownTag(self.tag.to_string())
    }
}

fn ids_value(ids: &[ItemId]) -> Value {
    Value::Array(ids.iter().map(|id| json!(id.as_str())).collect())
}

fn play_state_value(state: &PlayState) -> Value {
    serde_json::to_value(state).unwrap_or_default()
}

impl ClientMessage {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Enqueue(id) => json!([client::ENQUEUE, id.as_str()]),
            Self::Skip => json!([client::SKIP]),
            Self::Advance(d) => json!([client::ADVANCE, d]),
            Self::SetPlayState(state) => json!([client::PLAY_STATE, play_state_value(state)]),
            Self::SetVolume(v) => json!([client::VOLUME, v]),
            Self::ReplaceQueue(ids) => json!([client::REPLACE_QUEUE, ids_value(ids)]),
            Self::Sync => json!([client::SYNC]),
            Self::Ping(sent) => json!([client::PING, sent]),
        }
    }

    pub fn encode(&self) -> String {
        self.to_value().to_string()
    }

    pub fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let t = Tuple::parse(value)?;
        let msg = match t.tag {
            client::ENQUEUE => Self::Enqueue(t.id(&t.arity(1)?[0], "id")?),
            client::SKIP => {
                t.arity(0)?;
                Self::Skip
            }
            client::ADVANCE => Self::Advance(t.discriminator(&t.arity(1)?[0])?),
            client::PLAY_STATE => Self::SetPlayState(t.play_state(&t.arity(1)?[0])?),
            client::VOLUME => Self::SetVolume(t.number(&t.arity(1)?[0], "volume")?),
            client::REPLACE_QUEUE => Self::ReplaceQueue(t.submitted_ids(&t.arity(1)?[0])?),
            client::SYNC => {
                t.arity(0)?;
                Self::Sync
            }
            client::PING => Self::Ping(t.number(&t.arity(1)?[0], "sent time")?),
            _ => return Err(t.unknown()),
        };
        Ok(msg)
    }

    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        Self::from_value(&serde_json::from_str(text)?)
    }
}

impl ServerMessage {
    pub fn to_value(&self) -> Value {
        match self {
            Self::ItemChanged { id, discriminator } => json!([
                server::ITEM_CHANGED,
                id.as_ref().map(ItemId::as_str),
                discriminator
            ]),
            Self::PlayStateChanged(state) => json!([server::PLAY_STATE, play_state_value(state)]),
            Self::VolumeChanged(v) => json!([server::VOLUME, v]),
            Self::QueueChanged(ids) => json!([server::QUEUE, ids_value(ids)]),
            Self::CatalogEntryChanged { id, entry } => json!([
                server::CATALOG_ENTRY,
                id.as_str(),
                serde_json::to_value(entry).unwrap_or_default()
            ]),
            Self::PingEcho { sent, server_time } => json!([server::PING_ECHO, sent, server_time]),
        }
    }

    pub fn encode(&self) -> String {
        self.to_value().to_string()
    }

    pub fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let t = Tuple::parse(value)?;
        let msg = match t.tag {
            server::ITEM_CHANGED => {
                let p = t.arity(2)?;
                let id = match &p[0] {
                    Value::Null => None,
                    v => Some(t.id(v, "id")?),
                };
                Self::ItemChanged {
                    id,
                    discriminator: t.discriminator(&p[1])?,
                }
            }
            server::PLAY_STATE => Self::PlayStateChanged(t.play_state(&t.arity(1)?[0])?),
            server::VOLUME => Self::VolumeChanged(t.number(&t.arity(1)?[0], "volume")?),
            server::QUEUE => Self::QueueChanged(t.ids(&t.arity(1)?[0])?),
            server::CATALOG_ENTRY => {
                let p = t.arity(2)?;
                Self::CatalogEntryChanged {
                    id: t.id(&p[0], "id")?,
                    entry: CatalogEntry::deserialize(&p[1]).map_err(|_| t.invalid("entry"))?,
                }
            }
            server::PING_ECHO => {
                let p = t.arity(2)?;
                Self::PingEcho {
                    sent: t.number(&p[0], "sent time")?,
                    server_time: t.number(&p[1], "server time")?,
                }
            }
            _ => return Err(t.unknown()),
        };
        Ok(msg)
    }

    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        Self::from_value(&serde_json::from_str(text)?)
    }
}
