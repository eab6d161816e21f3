//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID
//! タスク ID は外部クライアントに渡す「ハンドル」なので、推測されにくい
//! 128-bit の ULID を使います。
//!
//! ## ULID の特性
//! - **先頭 48-bit**: timestamp（ミリ秒）
//! - **残り 80-bit**: ランダム（衝突しない前提で呼び出し側が生成できる）
//! - **UUID互換**: 128-bit で UUID と同じサイズ
//!
//! ## Phantom Type パターン
//! `Id<T>` の `T` は実行時には使わないマーカー型で、
//! `TaskId` と `WorkerId` をコンパイル時に区別します。
//!
//! 外部表現は `"{prefix}{ulid}"`（例: `task-01HV...`）。JSON でも同じ文字列になります。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display / FromStr で使うプレフィックス（"task-", "worker-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// 文字列から ID を復元できなかった
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid id: {input:?}")]
pub struct ParseIdError {
    input: String,
}

/// プレフィックス付き（`task-01HV...`）と裸の ULID の両方を受け付ける
impl<T: IdMarker> FromStr for Id<T> {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(T::prefix()).unwrap_or(s);
        Ulid::from_string(raw)
            .map(Self::from_ulid)
            .map_err(|_| ParseIdError {
                input: s.to_string(),
            })
    }
}

impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Task のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Worker のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Worker {}

impl IdMarker for Worker {
    fn prefix() -> &'static str {
        "worker-"
    }
}

/// Identifier of a Task (one submitted solve request; the external handle).
pub type TaskId = Id<Task>;

/// Identifier of a pooled Worker (logging identity).
pub type WorkerId = Id<Worker>;
