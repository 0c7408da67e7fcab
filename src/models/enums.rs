//! Shared domain enums, persisted as TEXT

use serde::{Deserialize, Serialize};
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    Decode, Encode, Postgres,
};
use utoipa::ToSchema;

/// Implements string conversions and TEXT column mapping for a fieldless enum
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let s = <&str as Decode<Postgres>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    HeadLibrarian,
    Librarian,
    Student,
}

text_enum!(Role {
    HeadLibrarian => "HEAD_LIBRARIAN",
    Librarian => "LIBRARIAN",
    Student => "STUDENT",
});

impl Role {
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::HeadLibrarian | Role::Librarian)
    }
}

// ---------------------------------------------------------------------------
// LoanStatus
// ---------------------------------------------------------------------------

/// Loan lifecycle state; RETURNED is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Borrowed,
    PendingConfirmation,
    Returned,
}

text_enum!(LoanStatus {
    Borrowed => "BORROWED",
    PendingConfirmation => "PENDING_CONFIRMATION",
    Returned => "RETURNED",
});

// ---------------------------------------------------------------------------
// ReturnCondition
// ---------------------------------------------------------------------------

/// State of the copy when it comes back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnCondition {
    Normal,
    Damaged,
    Lost,
}

text_enum!(ReturnCondition {
    Normal => "NORMAL",
    Damaged => "DAMAGED",
    Lost => "LOST",
});

// ---------------------------------------------------------------------------
// FineKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FineKind {
    None,
    Late,
    Damaged,
    Lost,
}

text_enum!(FineKind {
    None => "NONE",
    Late => "LATE",
    Damaged => "DAMAGED",
    Lost => "LOST",
});

// ---------------------------------------------------------------------------
// StockReason
// ---------------------------------------------------------------------------

/// Why an available-stock counter moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockReason {
    Loan,
    Return,
    CopyCountEdit,
}

text_enum!(StockReason {
    Loan => "LOAN",
    Return => "RETURN",
    CopyCountEdit => "COPY_COUNT_EDIT",
});
