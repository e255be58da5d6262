// ============================================
// src/symbols.rs
// シンボル（お題）のデータ構造
// ============================================

use serde::{Deserialize, Deserializer, Serialize};

/// 1つのシンボル。名前が表示ラベル兼識別子になる
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Symbol {
    name: String,
}

impl Symbol {
    /// 前後の空白を取り除いて作成する (空なら None)
    pub fn new(name: impl AsRef<str>) -> Option<Self> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            name: trimmed.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// キャッシュから読み込む場合も `new` と同じルールを通す
impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Record {
            name: String,
        }

        let record = Record::deserialize(deserializer)?;
        Symbol::new(&record.name)
            .ok_or_else(|| serde::de::Error::custom("symbol name must not be blank"))
    }
}

/// シンボルの一覧 (取得した順番のまま。重複は取り除かない)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolCollection {
    symbols: Vec<Symbol>,
}

impl SymbolCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, symbol: Symbol) {
        self.symbols.push(symbol);
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// 名前だけを順番に返す
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(Symbol::name)
    }
}

impl FromIterator<Symbol> for SymbolCollection {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        Self {
            symbols: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
pub(crate) fn collection_of(names: &[&str]) -> SymbolCollection {
    names.iter().filter_map(Symbol::new).collect()
}
