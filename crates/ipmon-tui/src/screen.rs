use std::fmt;

/// Top-level screens, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScreenId {
    #[default]
    Status,
    Config,
}

impl ScreenId {
    pub const ALL: [ScreenId; 2] = [Self::Status, Self::Config];

    /// Number key that jumps to this screen.
    pub fn number(self) -> u8 {
        match self {
            Self::Status => 1,
            Self::Config => 2,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.number() == n)
    }

    /// Next screen, wrapping around.
    pub fn next(self) -> Self {
        match self {
            Self::Status => Self::Config,
            Self::Config => Self::Status,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Status => "Status",
            Self::Config => "Config",
        }
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
