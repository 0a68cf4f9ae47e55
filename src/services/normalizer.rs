//! Identifier normalization service
//!
//! Maps raw platform identifiers to short display labels:
//! model ids, client user agents and billing usage-type codes.
//! Each mapping is a table of rules so new providers and clients
//! are one row, not another branch.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Label for empty or missing identifiers
pub const UNKNOWN_LABEL: &str = "unknown";

/// Label for clients that match no signature and have no short token
pub const OTHER_CLIENT_LABEL: &str = "other";

/// Longest fallback client token kept as-is
const MAX_CLIENT_TOKEN_LEN: usize = 20;

/// Namespaces that prefix foundation model ids ("anthropic.claude-...")
const MODEL_PROVIDERS: &[&str] = &[
    "anthropic",
    "amazon",
    "meta",
    "mistral",
    "cohere",
    "ai21",
    "stability",
    "deepseek",
    "writer",
    "openai",
    "qwen",
    "twelvelabs",
    "luma",
];

/// Cross-region inference profile prefixes ("us.anthropic.claude-...")
const INFERENCE_PROFILE_GEOS: &[&str] = &["us", "eu", "apac", "us-gov", "global"];

static DATE_STAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d{8}(?:-v\d+)?$").expect("valid regex"));
static BARE_VERSION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-v\d+$").expect("valid regex"));
static REGION_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2,4}\d+-").expect("valid regex"));

// ========== Model labels ==========

#[derive(Debug, Clone, Copy)]
enum ModelRule {
    /// "arn:...:foundation-model/anthropic.x" → "anthropic.x"
    ResourcePath,
    /// "anthropic.claude-x" → "claude-x"
    ProviderNamespace,
    /// "claude-x:0" → "claude-x"
    VersionSuffix,
    /// "claude-x-20250514-v1" → "claude-x"
    DateStamp,
    /// "titan-text-express-v1" → "titan-text-express", but "claude-v2" stays
    BareVersionTag,
}

const MODEL_RULES: [ModelRule; 5] = [
    ModelRule::ResourcePath,
    ModelRule::ProviderNamespace,
    ModelRule::VersionSuffix,
    ModelRule::DateStamp,
    ModelRule::BareVersionTag,
];

impl ModelRule {
    fn strip(self, name: &str) -> Option<&str> {
        match self {
            ModelRule::ResourcePath => name.rfind('/').map(|idx| &name[idx + 1..]),
            ModelRule::ProviderNamespace => strip_provider_namespace(name),
            ModelRule::VersionSuffix => {
                let (head, version) = name.rsplit_once(':')?;
                is_digits(version).then_some(head)
            }
            ModelRule::DateStamp => DATE_STAMP.find(name).map(|m| &name[..m.start()]),
            ModelRule::BareVersionTag => {
                let m = BARE_VERSION_TAG.find(name)?;
                let head = &name[..m.start()];
                head.contains('-').then_some(head)
            }
        }
    }
}

fn strip_provider_namespace(name: &str) -> Option<&str> {
    let (head, rest) = name.split_once('.')?;
    let head = head.to_ascii_lowercase();
    if MODEL_PROVIDERS.contains(&head.as_str()) {
        return Some(rest);
    }
    if INFERENCE_PROFILE_GEOS.contains(&head.as_str()) {
        let (provider, model) = rest.split_once('.')?;
        let provider = provider.to_ascii_lowercase();
        return MODEL_PROVIDERS.contains(&provider.as_str()).then_some(model);
    }
    None
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Normalize a model identifier to a short display label.
///
/// # Examples
/// ```
/// use bedusage::services::normalizer::normalize_model_label;
///
/// assert_eq!(normalize_model_label("anthropic.claude-v2:1"), "claude-v2");
/// assert_eq!(normalize_model_label("amazon.titan-text-express-v1"), "titan-text-express");
/// ```
pub fn normalize_model_label(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return UNKNOWN_LABEL.to_string();
    }

    let label = MODEL_RULES
        .iter()
        .fold(raw, |name, rule| rule.strip(name).unwrap_or(name));

    if label.is_empty() {
        raw.to_string()
    } else {
        label.to_string()
    }
}

// ========== Client labels ==========

#[derive(Debug, Clone, Copy)]
enum Match {
    Prefix,
    Contains,
}

struct ClientSignature {
    pattern: &'static str,
    matcher: Match,
    label: &'static str,
}

/// First match wins, so the CLI (whose agent also names botocore) comes first.
const CLIENT_SIGNATURES: &[ClientSignature] = &[
    ClientSignature::prefix("aws-cli/", "aws-cli"),
    ClientSignature::prefix("boto3/", "boto3"),
    ClientSignature::prefix("botocore/", "botocore"),
    ClientSignature::contains("aws-sdk-js", "sdk-js"),
    ClientSignature::contains("aws-sdk-java", "sdk-java"),
    ClientSignature::contains("aws-sdk-go", "sdk-go"),
    ClientSignature::contains("aws-sdk-dotnet", "sdk-dotnet"),
    ClientSignature::contains("aws-sdk-rust", "sdk-rust"),
    ClientSignature::contains("aws-sdk-ruby", "sdk-ruby"),
    ClientSignature::contains("aws-sdk-php", "sdk-php"),
    ClientSignature::prefix("aws internal", "aws-internal"),
    ClientSignature::contains("console.amazonaws.com", "aws-console"),
    ClientSignature::contains("bedrock.amazonaws.com", "bedrock-api"),
];

impl ClientSignature {
    const fn prefix(pattern: &'static str, label: &'static str) -> Self {
        Self {
            pattern,
            matcher: Match::Prefix,
            label,
        }
    }

    const fn contains(pattern: &'static str, label: &'static str) -> Self {
        Self {
            pattern,
            matcher: Match::Contains,
            label,
        }
    }

    fn matches(&self, agent_lower: &str) -> bool {
        match self.matcher {
            Match::Prefix => agent_lower.starts_with(self.pattern),
            Match::Contains => agent_lower.contains(self.pattern),
        }
    }
}

/// Normalize a client user-agent string to a short label
pub fn normalize_client_label(raw: &str) -> String {
    let agent = raw.trim();
    if agent.is_empty() {
        return UNKNOWN_LABEL.to_string();
    }

    let lower = agent.to_ascii_lowercase();
    if let Some(signature) = CLIENT_SIGNATURES.iter().find(|s| s.matches(&lower)) {
        return signature.label.to_string();
    }

    let token = agent
        .split(['/', ' ', ';', '('])
        .next()
        .unwrap_or_default();
    if !token.is_empty() && token.chars().count() <= MAX_CLIENT_TOKEN_LEN {
        token.to_string()
    } else {
        OTHER_CLIENT_LABEL.to_string()
    }
}

// ========== Usage-type labels ==========

const USAGE_OPERATIONS: &[&str] = &[
    "MP:",
    "InvokeModel-",
    "ModelInvocation-",
    "Converse-",
    "BatchInference-",
    "ProvisionedThroughput-",
    "CustomModel-",
    "ModelStorage-",
];

const USAGE_PROVIDERS: &[&str] = &[
    "Anthropic-",
    "Amazon-",
    "Meta-",
    "Mistral-",
    "Cohere-",
    "AI21-",
    "Stability-",
    "DeepSeek-",
    "Writer-",
];

#[derive(Debug, Clone, Copy)]
enum UsageTypeRule {
    /// "USE1-..." / "EUC1-..."
    RegionCode,
    Operation,
    Provider,
}

const USAGE_TYPE_RULES: [UsageTypeRule; 3] = [
    UsageTypeRule::RegionCode,
    UsageTypeRule::Operation,
    UsageTypeRule::Provider,
];

impl UsageTypeRule {
    fn strip(self, code: &str) -> Option<&str> {
        match self {
            UsageTypeRule::RegionCode => REGION_CODE.find(code).map(|m| &code[m.end()..]),
            UsageTypeRule::Operation => strip_token(code, USAGE_OPERATIONS),
            UsageTypeRule::Provider => strip_token(code, USAGE_PROVIDERS),
        }
    }
}

fn strip_token<'a>(code: &'a str, tokens: &[&str]) -> Option<&'a str> {
    tokens.iter().find_map(|token| {
        let head = code.get(..token.len())?;
        head.eq_ignore_ascii_case(token).then(|| &code[token.len()..])
    })
}

/// Normalize a billing usage-type code to a display label.
/// Never returns an empty label: codes no rule touches come back verbatim.
pub fn normalize_usage_type_label(raw: &str) -> String {
    if raw.trim().is_empty() {
        return UNKNOWN_LABEL.to_string();
    }

    let mut label = raw;
    let mut stripped = false;
    for rule in USAGE_TYPE_RULES {
        if let Some(rest) = rule.strip(label) {
            label = rest;
            stripped = true;
        }
    }

    if !stripped || label.is_empty() {
        raw.to_string()
    } else {
        label.to_string()
    }
}

// ========== Per-report cache ==========

/// Which rule table a mapping applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Model,
    Client,
    UsageType,
}

impl LabelKind {
    pub fn normalize(self, raw: &str) -> String {
        match self {
            LabelKind::Model => normalize_model_label(raw),
            LabelKind::Client => normalize_client_label(raw),
            LabelKind::UsageType => normalize_usage_type_label(raw),
        }
    }
}

/// Memoized `raw → label` for one label kind.
///
/// Owned by a single report build; each distinct raw value is normalized once.
#[derive(Debug, Clone)]
pub struct NameMapping {
    kind: LabelKind,
    labels: HashMap<String, String>,
}

impl NameMapping {
    pub fn new(kind: LabelKind) -> Self {
        Self {
            kind,
            labels: HashMap::new(),
        }
    }

    /// Build eagerly from the distinct identifiers of one batch
    pub fn from_identifiers<'a, I>(kind: LabelKind, identifiers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut mapping = Self::new(kind);
        for raw in identifiers {
            mapping.label(raw);
        }
        mapping
    }

    pub fn kind(&self) -> LabelKind {
        self.kind
    }

    /// Label for `raw`, derived on first use
    pub fn label(&mut self, raw: &str) -> &str {
        let kind = self.kind;
        self.labels
            .entry(raw.to_string())
            .or_insert_with(|| kind.normalize(raw))
            .as_str()
    }

    /// Previously derived label, if any
    pub fn get(&self, raw: &str) -> Option<&str> {
        self.labels.get(raw).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// The three mappings one report needs
#[derive(Debug, Clone)]
pub struct NameCache {
    pub models: NameMapping,
    pub clients: NameMapping,
    pub usage_types: NameMapping,
}

impl NameCache {
    pub fn new() -> Self {
        Self {
            models: NameMapping::new(LabelKind::Model),
            clients: NameMapping::new(LabelKind::Client),
            usage_types: NameMapping::new(LabelKind::UsageType),
        }
    }
}

impl Default for NameCache {
    fn default() -> Self {
        Self::new()
    }
}
