//! Title classifier — seniority, function, buying role, and persona score.
//!
//! Every function here is pure: identical inputs always produce identical
//! outputs, which is what makes re-ingesting the same batch idempotent.
//!
//! Rules are evaluated in a fixed priority order because one title often
//! carries several matching keywords ("Senior Vice President" must resolve to
//! the VP family, not to "Senior").

use crate::model::{Contact, JobFunction, JobLevel, PriorityTier, RoleType};

/// Starting point of every persona score.
pub const BASE_SCORE: u8 = 50;

/// Upper bound of every persona score.
pub const MAX_SCORE: u8 = 100;

const DECISION_MAKER_BONUS: u8 = 5;

// ─── Title text ──────────────────────────────────────────────────────────────

/// A title lower-cased with punctuation folded to single spaces, so both
/// phrase and whole-word lookups are simple string operations.
struct TitleText {
  padded: String,
}

impl TitleText {
  fn new(title: &str) -> Self {
    let folded: String = title
      .chars()
      .map(|c| {
        if c.is_alphanumeric() {
          c.to_ascii_lowercase()
        } else {
          ' '
        }
      })
      .collect();
    let words = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    Self {
      padded: format!(" {words} "),
    }
  }

  fn is_empty(&self) -> bool { self.padded.trim().is_empty() }

  /// Substring match, so "engineer" also matches "engineering".
  fn contains(&self, needle: &str) -> bool { self.padded.contains(needle) }

  /// Whole-word (or whole-phrase) match, so "coo" does not match
  /// "coordinator".
  fn has_word(&self, word: &str) -> bool {
    self.padded.contains(&format!(" {word} "))
  }

  fn contains_any(&self, needles: &[&str]) -> bool {
    needles.iter().any(|n| self.contains(n))
  }

  fn has_any_word(&self, words: &[&str]) -> bool {
    words.iter().any(|w| self.has_word(w))
  }
}

// ─── Job level ───────────────────────────────────────────────────────────────

const C_SUITE: &[&str] = &["ceo", "cto", "cfo", "coo", "cmo", "cro", "cio", "cpo"];
const SVP_WORDS: &[&str] = &[
  "svp",
  "evp",
  "senior vice president",
  "executive vice president",
];

/// Infer seniority from a free-text title.
pub fn infer_job_level(title: &str) -> JobLevel {
  let t = TitleText::new(title);
  if t.is_empty() {
    return JobLevel::Unknown;
  }

  if t.contains("chief") || t.has_any_word(C_SUITE) {
    return JobLevel::Executive;
  }
  if t.contains("executive director") || t.contains("managing director") {
    return JobLevel::Executive;
  }
  if t.has_word("president") && !t.has_word("vice president") {
    return JobLevel::Executive;
  }
  if t.has_any_word(SVP_WORDS) {
    return JobLevel::Svp;
  }
  if t.has_word("vice president") || t.has_word("vp") {
    return JobLevel::Vp;
  }
  if t.contains("director") || t.contains("head of") {
    return JobLevel::Director;
  }
  if t.contains("manager") {
    return if t.contains("senior manager") || t.contains("sr manager") {
      JobLevel::SeniorManager
    } else {
      JobLevel::Manager
    };
  }
  if t.contains_any(&["lead", "principal", "senior"]) {
    return JobLevel::Senior;
  }
  if t.contains_any(&["analyst", "associate", "engineer"]) {
    return JobLevel::IndividualContributor;
  }
  JobLevel::Unknown
}

// ─── Job function ────────────────────────────────────────────────────────────

/// Ordered keyword vocabulary; the first function with a hit wins.
const FUNCTION_KEYWORDS: &[(JobFunction, &[&str])] = &[
  (JobFunction::Product, &["product"]),
  (JobFunction::Engineering, &[
    "engineer",
    "developer",
    "software",
    "technology",
    "architect",
    "devops",
    "platform",
    " cto ",
  ]),
  (JobFunction::Design, &[
    "design",
    " ux ",
    " ui ",
    "user experience",
    "creative",
  ]),
  (JobFunction::CustomerSuccess, &[
    "customer success",
    "customer experience",
    "support",
    "client services",
    "account management",
  ]),
  (JobFunction::Operations, &["operations", " ops ", " coo "]),
  (JobFunction::StrategyInnovation, &[
    "strategy",
    "strategic",
    "innovation",
    "transformation",
    "digital",
  ]),
  (JobFunction::BankingFinance, &[
    "banking",
    "finance",
    "financial",
    "lending",
    "payments",
    "treasury",
    " cfo ",
  ]),
  (JobFunction::Marketing, &["marketing", "brand", "growth", " cmo "]),
  (JobFunction::Sales, &[
    "sales",
    "business development",
    "account executive",
    "revenue",
    "partnership",
    " cro ",
  ]),
  (JobFunction::Events, &["event", "conference", "community"]),
  (JobFunction::Content, &[
    "content",
    "editor",
    "editorial",
    "communications",
    "writer",
  ]),
];

/// Infer the functional area of a title; `General Management` when nothing
/// in the vocabulary matches.
pub fn infer_job_function(title: &str) -> JobFunction {
  let t = TitleText::new(title);
  FUNCTION_KEYWORDS
    .iter()
    .find(|(_, keywords)| t.contains_any(keywords))
    .map(|(function, _)| *function)
    .unwrap_or_default()
}

// ─── Role type ───────────────────────────────────────────────────────────────

const STRATEGIC_KEYWORDS: &[&str] =
  &["strategy", "strategic", "innovation", "transformation", "product"];

/// Infer the buying-committee role from level and title.
pub fn infer_role_type(level: JobLevel, title: &str) -> RoleType {
  let t = TitleText::new(title);
  match level {
    JobLevel::Executive | JobLevel::Svp | JobLevel::Vp => RoleType::DecisionMaker,
    JobLevel::Director if t.contains_any(STRATEGIC_KEYWORDS) => {
      RoleType::DecisionMaker
    }
    JobLevel::Director => RoleType::Influencer,
    JobLevel::SeniorManager | JobLevel::Manager | JobLevel::Senior => {
      RoleType::Influencer
    }
    _ if t.contains_any(&["analyst", "associate"]) => RoleType::Champion,
    _ => RoleType::User,
  }
}

// ─── Persona score ───────────────────────────────────────────────────────────

fn level_bonus(level: JobLevel) -> u8 {
  match level {
    JobLevel::Executive => 30,
    JobLevel::Svp => 25,
    JobLevel::Vp => 20,
    JobLevel::Director => 15,
    JobLevel::SeniorManager => 10,
    JobLevel::Manager => 8,
    JobLevel::Senior => 5,
    JobLevel::IndividualContributor | JobLevel::Unknown => 0,
  }
}

fn function_bonus(function: JobFunction) -> u8 {
  match function {
    JobFunction::StrategyInnovation => 15,
    JobFunction::Product => 12,
    JobFunction::Engineering | JobFunction::BankingFinance => 10,
    JobFunction::Design | JobFunction::Marketing => 8,
    JobFunction::CustomerSuccess => 7,
    JobFunction::Sales => 6,
    JobFunction::Operations | JobFunction::Events | JobFunction::Content => 5,
    JobFunction::GeneralManagement => 0,
  }
}

fn tier_bonus(tier: Option<PriorityTier>) -> u8 {
  match tier {
    Some(PriorityTier::Tier1) => 3,
    Some(PriorityTier::Tier2) => 2,
    Some(PriorityTier::Tier3) => 1,
    Some(PriorityTier::Tier4 | PriorityTier::Customer) | None => 0,
  }
}

/// Weighted-sum persona score in `0..=100`.
pub fn calculate_persona_score(
  level: JobLevel,
  function: JobFunction,
  role: RoleType,
  tier: Option<PriorityTier>,
) -> u8 {
  let role_bonus = if role == RoleType::DecisionMaker {
    DECISION_MAKER_BONUS
  } else {
    0
  };

  let total = u16::from(BASE_SCORE)
    + u16::from(level_bonus(level))
    + u16::from(function_bonus(function))
    + u16::from(role_bonus)
    + u16::from(tier_bonus(tier));

  total.min(u16::from(MAX_SCORE)) as u8
}

// ─── Whole-contact classification ────────────────────────────────────────────

/// All attributes derived from one title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
  pub job_level:     JobLevel,
  pub job_function:  JobFunction,
  pub role_type:     RoleType,
  pub persona_score: u8,
}

/// Classify a title for a company of the given tier. A missing title takes
/// the defined fallback: `Unknown`, `General Management`, `User`, and a score
/// of the base plus the tier bonus.
pub fn classify_title(title: Option<&str>, tier: Option<PriorityTier>) -> Classification {
  let title = title.unwrap_or_default();
  let job_level = infer_job_level(title);
  let job_function = infer_job_function(title);
  let role_type = infer_role_type(job_level, title);
  Classification {
    job_level,
    job_function,
    role_type,
    persona_score: calculate_persona_score(job_level, job_function, role_type, tier),
  }
}

impl Contact {
  /// Recompute every derived attribute from the current title.
  pub fn classify(&mut self, tier: Option<PriorityTier>) {
    let c = classify_title(self.title.as_deref(), tier);
    self.job_level = c.job_level;
    self.job_function = c.job_function;
    self.role_type = c.role_type;
    self.persona_score = c.persona_score;
  }
}
