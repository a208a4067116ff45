use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::str::FromStr;
use crate::models::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Id,
    PairName,
    CreatedAt,
    UpdatedAt,
    LaunchFdv,
    CurrentFdv,
    LaunchLiquidity,
    CurrentLiquidity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

/// Newest launches first.
impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::CreatedAt,
            direction: SortDirection::Descending,
        }
    }
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort {kind}: {value}")]
pub struct ParseSortError {
    kind: &'static str,
    value: String,
}

impl FromStr for SortKey {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "id" => Ok(SortKey::Id),
            "pair_name" => Ok(SortKey::PairName),
            "created_at" => Ok(SortKey::CreatedAt),
            "updated_at" => Ok(SortKey::UpdatedAt),
            "launch_fdv" => Ok(SortKey::LaunchFdv),
            "current_fdv" => Ok(SortKey::CurrentFdv),
            "launch_liquidity" => Ok(SortKey::LaunchLiquidity),
            "current_liquidity" => Ok(SortKey::CurrentLiquidity),
            other => Err(ParseSortError { kind: "key", value: other.to_string() }),
        }
    }
}

impl FromStr for SortDirection {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(ParseSortError { kind: "direction", value: other.to_string() }),
        }
    }
}

fn compare(a: &Token, b: &Token, key: SortKey) -> Ordering {
    match key {
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::PairName => a.pair_name.cmp(&b.pair_name),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortKey::LaunchFdv => a.launch_fdv.total_cmp(&b.launch_fdv),
        SortKey::CurrentFdv => a.current_fdv.total_cmp(&b.current_fdv),
        SortKey::LaunchLiquidity => a.launch_liquidity.total_cmp(&b.launch_liquidity),
        SortKey::CurrentLiquidity => a.current_liquidity.total_cmp(&b.current_liquidity),
    }
}

/// Ordered copy of `snapshot`. Stable: equal keys keep snapshot order in
/// either direction.
pub fn sorted_rows<T>(snapshot: &[T], spec: SortSpec) -> Vec<T>
where
    T: Borrow<Token> + Clone,
{
    let mut rows = snapshot.to_vec();
    match spec.direction {
        SortDirection::Ascending => rows.sort_by(|a, b| {
            compare(<T as Borrow<Token>>::borrow(a), <T as Borrow<Token>>::borrow(b), spec.key)
        }),
        SortDirection::Descending => rows.sort_by(|a, b| {
            compare(<T as Borrow<Token>>::borrow(b), <T as Borrow<Token>>::borrow(a), spec.key)
        }),
    }
    rows
}
