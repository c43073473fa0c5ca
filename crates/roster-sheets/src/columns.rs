//! Declarative column discovery.
//!
//! Column roles are assigned by ordered rule tables evaluated against
//! tokenised labels. The first rule that matches a label decides its role.
//!
//! A keyword matches a label token when the token equals it, or, for keywords
//! of four or more characters, when the token starts with it (`"firstname"`
//! matches `first`, `"surname"` does not match `name`). Keywords in
//! [`INFIX_KEYWORDS`] match anywhere inside a token (`"billrate"`).

/// What a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
  FirstName,
  LastName,
  /// A combined "first last" name.
  FullName,
  Company,
  Nationality,
  Title,
  Function,
  Discipline,
  Projects,
  ReportingManager,
  Currency,
  ContractType,
  Rate,
}

/// One rule: every keyword group must match some token, and no token may
/// match an excluded keyword.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
  pub role:    ColumnRole,
  pub all_of:  &'static [&'static [&'static str]],
  pub none_of: &'static [&'static str],
}

/// Keywords that also match in the middle or at the end of a token.
pub const INFIX_KEYWORDS: &[&str] = &["rate"];

const GIVEN_MARKERS: &[&str] =
  &["first", "given", "forename", "ad", "adı", "adi", "isim"];
const NAME_MARKERS: &[&str] =
  &["name", "ad", "adı", "adi", "isim", "personel", "personnel"];
const SURNAME_MARKERS: &[&str] = &["surname", "soyad", "soyadı", "soyadi", "soyisim"];
const LAST_MARKERS: &[&str] =
  &["last", "family", "surname", "soyad", "soyadı", "soyadi", "soyisim"];
const ID_MARKERS: &[&str] = &["id", "no", "sicil"];
const NOT_A_PERSON: &[&str] = &[
  "id", "project", "proje", "company", "firma", "file", "sheet", "scope",
  "office", "reporting", "manager", "client",
];

/// Person-name columns, most specific first.
pub const NAME_RULES: &[ColumnRule] = &[
  ColumnRule {
    role:    ColumnRole::FullName,
    all_of:  &[NAME_MARKERS, SURNAME_MARKERS],
    none_of: ID_MARKERS,
  },
  ColumnRule { role: ColumnRole::LastName, all_of: &[LAST_MARKERS], none_of: ID_MARKERS },
  ColumnRule {
    role:    ColumnRole::FirstName,
    all_of:  &[GIVEN_MARKERS],
    none_of: ID_MARKERS,
  },
  ColumnRule {
    role:    ColumnRole::FullName,
    all_of:  &[&["name", "personel", "personnel", "employee"]],
    none_of: NOT_A_PERSON,
  },
];

/// Reference-sheet attribute columns.
pub const REFERENCE_RULES: &[ColumnRule] = &[
  ColumnRule {
    role:    ColumnRole::ReportingManager,
    all_of:  &[&["reporting", "reports", "manager", "yönetici"]],
    none_of: &[],
  },
  ColumnRule {
    role:    ColumnRole::Company,
    all_of:  &[&["company", "firma", "şirket"]],
    none_of: &[],
  },
  ColumnRule {
    role:    ColumnRole::Nationality,
    all_of:  &[&["nationality", "uyruk"]],
    none_of: &[],
  },
  ColumnRule { role: ColumnRole::Title, all_of: &[&["title", "unvan"]], none_of: &[] },
  ColumnRule {
    role:    ColumnRole::Function,
    all_of:  &[&["function", "fonksiyon"]],
    none_of: &[],
  },
  ColumnRule {
    role:    ColumnRole::Discipline,
    all_of:  &[&["discipline", "disiplin"]],
    none_of: &[],
  },
  ColumnRule {
    role:    ColumnRole::Projects,
    all_of:  &[&["project", "proje"]],
    none_of: &[],
  },
];

/// Rate-sheet field columns (row 1 of the sheet).
pub const RATE_RULES: &[ColumnRule] = &[
  ColumnRule {
    role:    ColumnRole::Currency,
    all_of:  &[&["currency", "curr", "döviz", "para"]],
    none_of: &[],
  },
  ColumnRule {
    role:    ColumnRole::ContractType,
    all_of:  &[&["contract", "sözleşme"]],
    none_of: &[],
  },
  ColumnRule {
    role:    ColumnRole::Company,
    all_of:  &[&["company", "firma", "şirket"]],
    none_of: &[],
  },
  ColumnRule {
    role:    ColumnRole::Rate,
    all_of:  &[&["rate", "rates", "hourly", "ücret"]],
    none_of: &[],
  },
];

impl ColumnRule {
  pub fn matches(&self, label: &str) -> bool {
    let tokens = label_tokens(label);
    self.all_of.iter().all(|group| any_keyword(&tokens, group))
      && !any_keyword(&tokens, self.none_of)
  }
}

/// Lower-cased alphanumeric runs of a label.
pub fn label_tokens(label: &str) -> Vec<String> {
  label
    .to_lowercase()
    .split(|c: char| !c.is_alphanumeric())
    .filter(|t| !t.is_empty())
    .map(str::to_owned)
    .collect()
}

fn keyword_matches(token: &str, keyword: &str) -> bool {
  token == keyword
    || (keyword.chars().count() >= 4 && token.starts_with(keyword))
    || (INFIX_KEYWORDS.contains(&keyword) && token.contains(keyword))
}

fn any_keyword(tokens: &[String], keywords: &[&str]) -> bool {
  tokens
    .iter()
    .any(|t| keywords.iter().any(|k| keyword_matches(t, k)))
}

/// The role of the first rule in `rules` that matches `label`.
pub fn classify(label: &str, rules: &[ColumnRule]) -> Option<ColumnRole> {
  rules.iter().find(|r| r.matches(label)).map(|r| r.role)
}

/// `(column index, role)` for every column that some rule claims.
pub fn classify_columns(
  columns: &[String],
  rules: &[ColumnRule],
) -> Vec<(usize, ColumnRole)> {
  columns
    .iter()
    .enumerate()
    .filter_map(|(i, c)| classify(c, rules).map(|role| (i, role)))
    .collect()
}

/// First column that `rules` classify as `role`.
pub fn find_role(
  columns: &[String],
  rules: &[ColumnRule],
  role: ColumnRole,
) -> Option<usize> {
  columns.iter().position(|c| classify(c, rules) == Some(role))
}

/// The id column of the Reference and Rate sheets: a label that is exactly
/// `id`, `no`, or `sicil no` (any case).
pub fn find_id_column(columns: &[String]) -> Option<usize> {
  columns.iter().position(|c| {
    let c = c.trim().to_lowercase();
    c == "id" || c == "no" || c == "sicil no"
  })
}

/// Columns that look like they might hold an identifier, for previews.
pub fn is_id_candidate(label: &str) -> bool {
  label_tokens(label)
    .iter()
    .any(|t| t == "id" || t == "no" || t.starts_with("sicil"))
}
