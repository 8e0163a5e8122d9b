//! Ant 形式のパスパターン
//!
//! - `*` `?` `[...]` は 1 セグメント内だけにマッチ
//! - `**` は 0 個以上のセグメントにマッチ
//! - `/` で終わるパターンは末尾に `**` を補う（`docker/` == `docker/**`）
//! - スラッシュを含まないパターンはトップレベルのファイルだけにマッチ
//!
//! パスは `/` 区切りの相対パスで渡す。

use crate::error::{BuildError, BuildResult};
use glob::{MatchOptions, Pattern};

const SEGMENT_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
enum Segment {
    AnyDepth,
    Glob(Pattern),
}

#[derive(Debug, Clone)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn new(pattern: &str) -> BuildResult<Self> {
        let mut normalized = pattern.replace('\\', "/");
        if normalized.ends_with('/') {
            normalized.push_str("**");
        }

        let segments = normalized
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(|s| match s {
                "**" => Ok(Segment::AnyDepth),
                glob => Pattern::new(glob).map(Segment::Glob).map_err(|e| {
                    BuildError::Config(format!("invalid file pattern '{}': {}", pattern, e))
                }),
            })
            .collect::<BuildResult<Vec<_>>>()?;

        Ok(Self { segments })
    }

    pub fn matches(&self, relative_path: &str) -> bool {
        let parts: Vec<&str> = relative_path.split('/').filter(|s| !s.is_empty()).collect();
        match_segments(&self.segments, &parts)
    }
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((Segment::Glob(glob), rest)) => match path.split_first() {
            Some((head, tail)) => {
                glob.matches_with(head, SEGMENT_OPTIONS) && match_segments(rest, tail)
            }
            None => false,
        },
    }
}

/// include / exclude パターンの組
///
/// include が空なら全ファイルが対象。exclude が優先される。
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    includes: Vec<PathPattern>,
    excludes: Vec<PathPattern>,
}

impl FileFilter {
    pub fn new(includes: &[String], excludes: &[String]) -> BuildResult<Self> {
        let compile = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| PathPattern::new(p))
                .collect::<BuildResult<Vec<_>>>()
        };
        Ok(Self {
            includes: compile(includes)?,
            excludes: compile(excludes)?,
        })
    }

    pub fn matches(&self, relative_path: &str) -> bool {
        let included =
            self.includes.is_empty() || self.includes.iter().any(|p| p.matches(relative_path));
        included && !self.excludes.iter().any(|p| p.matches(relative_path))
    }
}
