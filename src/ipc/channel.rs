use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Opaque document key. The core process addresses files and directories by
/// content hash; the shell never interprets the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub u64);

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound channels to the core process. Channel names are wire contracts;
/// payload schemas live next to them below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    FileNew,
    DirNew,
    DirNewVd,
    DirRename,
    FileRename,
    SetTarget,
    Export,
    GetTagsDatabase,
    GetCustomCss,
    SetCustomCss,
    WinMinimise,
    WinMaximise,
    WinClose,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::FileNew => "file-new",
            Channel::DirNew => "dir-new",
            Channel::DirNewVd => "dir-new-vd",
            Channel::DirRename => "dir-rename",
            Channel::FileRename => "file-rename",
            Channel::SetTarget => "set-target",
            Channel::Export => "export",
            Channel::GetTagsDatabase => "get-tags-database",
            Channel::GetCustomCss => "get-custom-css",
            Channel::SetCustomCss => "set-custom-css",
            Channel::WinMinimise => "win-minimise",
            Channel::WinMaximise => "win-maximise",
            Channel::WinClose => "win-close",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// One outbound message. `id` correlates replies for reply-style sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: MessageId,
    pub channel: Channel,
    pub payload: Value,
}

/// A reply from the core process to a reply-style send
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub request: MessageId,
    pub payload: Value,
}

/// Payload for `file-new` and the `dir-new` family: a name, plus the parent
/// directory when one is selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntryPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<DocumentId>,
}

/// Payload for `file-rename` / `dir-rename`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePayload {
    pub name: String,
    pub hash: DocumentId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    Words,
    Chars,
}

impl TargetMode {
    pub fn label(&self) -> &'static str {
        match self {
            TargetMode::Words => "words",
            TargetMode::Chars => "characters",
        }
    }
}

/// Payload for `set-target`: a writing goal for one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPayload {
    pub hash: DocumentId,
    pub mode: TargetMode,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Html,
    Pdf,
    Docx,
    Odt,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Html,
        ExportFormat::Pdf,
        ExportFormat::Docx,
        ExportFormat::Odt,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Html => "HTML",
            ExportFormat::Pdf => "PDF",
            ExportFormat::Docx => "Word (docx)",
            ExportFormat::Odt => "OpenDocument (odt)",
        }
    }
}

/// Payload for `export`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPayload {
    pub hash: DocumentId,
    pub format: ExportFormat,
}

/// Payload for `set-custom-css`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomCssPayload {
    pub css: String,
}

/// One tag record from the `get-tags-database` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub name: String,
    pub count: u64,
}

/// Unsolicited events the core pushes to the shell
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum InboundEvent {
    /// A document became the active one in the editor
    DocumentOpened {
        hash: DocumentId,
        title: String,
        #[serde(default)]
        words: u64,
        #[serde(default)]
        chars: u64,
    },
    /// Updated session statistics
    Stats {
        words_total: u64,
        chars_total: u64,
        documents: u64,
    },
    /// A failure in the core that the user must see in full
    Error {
        title: String,
        message: String,
        #[serde(default)]
        details: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_wire_names_round_trip() {
        for channel in [
            Channel::FileNew,
            Channel::DirNewVd,
            Channel::GetTagsDatabase,
            Channel::WinMinimise,
        ] {
            let wire = serde_json::to_value(channel).unwrap();
            assert_eq!(wire, json!(channel.as_str()));
            let back: Channel = serde_json::from_value(wire).unwrap();
            assert_eq!(back, channel);
        }
    }

    #[test]
    fn rename_payload_schema() {
        let payload = RenamePayload {
            name: "Notes".into(),
            hash: DocumentId(42),
        };
        assert_eq!(
            serde_json::to_value(payload).unwrap(),
            json!({"name": "Notes", "hash": 42})
        );
    }

    #[test]
    fn new_entry_payload_omits_missing_parent() {
        let payload = NewEntryPayload {
            name: "draft.md".into(),
            hash: None,
        };
        assert_eq!(
            serde_json::to_value(payload).unwrap(),
            json!({"name": "draft.md"})
        );
    }

    #[test]
    fn target_payload_schema() {
        let payload = TargetPayload {
            hash: DocumentId(7),
            mode: TargetMode::Words,
            count: 500,
        };
        assert_eq!(
            serde_json::to_value(payload).unwrap(),
            json!({"hash": 7, "mode": "words", "count": 500})
        );
    }

    #[test]
    fn inbound_event_parses_document_opened() {
        let event: InboundEvent = serde_json::from_value(json!({
            "event": "document-opened",
            "hash": 9,
            "title": "Journal"
        }))
        .unwrap();
        match event {
            InboundEvent::DocumentOpened { hash, title, words, .. } => {
                assert_eq!(hash, DocumentId(9));
                assert_eq!(title, "Journal");
                assert_eq!(words, 0);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
