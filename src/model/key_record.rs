use std::fmt;

/// Whether a listing line describes the primary key or a subkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Primary,
    Subkey,
}

impl KeyKind {
    /// The marker word gpg prints at the start of the line.
    pub fn marker(self) -> &'static str {
        match self {
            KeyKind::Primary => "sec",
            KeyKind::Subkey => "ssb",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "sec" => Some(KeyKind::Primary),
            "ssb" => Some(KeyKind::Subkey),
            _ => None,
        }
    }
}

/// Suffix gpg appends to the kind marker when the secret material is not
/// stored locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StubMarker {
    /// `#`: secret material is missing (offline backup only).
    Offline,
    /// `>`: secret material lives on a smartcard.
    OnToken,
}

impl StubMarker {
    pub fn as_char(self) -> char {
        match self {
            StubMarker::Offline => '#',
            StubMarker::OnToken => '>',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '#' => Some(StubMarker::Offline),
            '>' => Some(StubMarker::OnToken),
            _ => None,
        }
    }
}

/// Single-letter key usage flag from the bracketed capability string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Sign,
    Encrypt,
    Authenticate,
    Certify,
}

impl Capability {
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'S' => Some(Capability::Sign),
            'E' => Some(Capability::Encrypt),
            'A' => Some(Capability::Authenticate),
            'C' => Some(Capability::Certify),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Capability::Sign => 'S',
            Capability::Encrypt => 'E',
            Capability::Authenticate => 'A',
            Capability::Certify => 'C',
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// One entry of `gpg --list-secret-keys`.
///
/// Records are built fresh from the listing on every query and may be
/// partially populated when a line did not match the expected layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub kind: KeyKind,
    pub stub: Option<StubMarker>,
    pub algorithm: String,
    pub short_id: String,
    /// Empty unless the listing emitted it.
    pub fingerprint: String,
    pub created_on: Option<String>,
    /// In the order gpg printed them.
    pub capabilities: Vec<Capability>,
    pub expires_on: Option<String>,
    /// Verbatim remainder of a following `card-no:` line.
    pub token_serial_ref: Option<String>,
}

impl KeyRecord {
    pub fn new(kind: KeyKind) -> Self {
        Self {
            kind,
            stub: None,
            algorithm: String::new(),
            short_id: String::new(),
            fingerprint: String::new(),
            created_on: None,
            capabilities: Vec::new(),
            expires_on: None,
            token_serial_ref: None,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.kind == KeyKind::Primary
    }

    pub fn is_stub(&self) -> bool {
        self.stub.is_some()
    }

    /// A key counts as token-resident when a `card-no:` reference was seen
    /// or the kind marker carries a stub suffix. Both signals are checked
    /// because gpg versions disagree on which one they print.
    pub fn resides_on_token(&self) -> bool {
        self.token_serial_ref
            .as_deref()
            .is_some_and(|serial| !serial.is_empty())
            || self.is_stub()
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn can_sign(&self) -> bool {
        self.has_capability(Capability::Sign)
    }

    /// `sec`, `sec#`, `ssb` or `ssb>` as gpg would print it.
    pub fn marker(&self) -> String {
        match self.stub {
            Some(stub) => format!("{}{}", self.kind.marker(), stub.as_char()),
            None => self.kind.marker().to_string(),
        }
    }

    /// Key id for use on the gpg command line, preferring the fingerprint.
    pub fn selector(&self) -> &str {
        if self.fingerprint.is_empty() {
            &self.short_id
        } else {
            &self.fingerprint
        }
    }

    pub fn capability_letters(&self) -> String {
        self.capabilities.iter().map(|c| c.letter()).collect()
    }
}
