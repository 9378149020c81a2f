// Relevance filter: keeps business-relevant terms and drops celebrity,
// political and entertainment noise regardless of category.

use std::collections::{BTreeMap, HashSet};

/// Rejected for every category. Single words match any word of a term
/// (singular or with a trailing `s`); multi-word entries match the whole term.
const BLACKLIST: &[&str] = &[
    // politics
    "election", "vote", "voter", "voting", "ballot", "president", "presidential", "senator",
    "senate", "congress", "congressman", "parliament", "politics", "political", "politician",
    "election campaign", "political campaign", "campaign trail", "democrat", "republican",
    "governor", "impeachment", "minister", "referendum", "white house",
    // celebrity and gossip
    "celebrity", "celeb", "gossip", "scandal", "paparazzi", "influencer drama", "royal",
    "kardashian", "red carpet", "divorce", "dating", "rumor",
    // entertainment
    "movie", "feature film", "film premiere", "actor", "actress", "singer", "rapper", "album",
    "concert", "concert tour", "world tour", "hollywood", "oscar", "grammy", "emmy", "premiere",
    "trailer", "episode", "season finale", "box office", "reality show", "streaming series",
];

/// Terms relevant to any small business.
const BUSINESS_VOCABULARY: &[&str] = &[
    "business", "smallbiz", "smallbusiness", "entrepreneur", "startup", "founder", "marketing",
    "sales", "customer", "consumer", "ecommerce", "retail", "brand", "branding", "pricing",
    "price", "revenue", "profit", "growth", "hiring", "jobs", "workforce", "economy", "inflation",
    "supply", "supply chain", "local", "shop", "store", "market", "innovation", "sustainability",
    "sustainable", "franchise", "investment", "funding", "product", "service", "delivery",
    "subscription", "loyalty", "digital", "social media", "automation", "remote work", "trend",
    "strategy", "small business", "online", "tax", "wages", "rent", "expansion",
];

/// Category → keywords. An entry applies when its key appears as whole words in
/// the category, so `"coffee shop"` picks up the `coffee` entry.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "fitness",
        &[
            "fitness", "workout", "gym", "exercise", "training", "wellness", "yoga", "pilates",
            "running", "cardio", "strength", "athlete",
        ],
    ),
    ("gym", &["gym", "workout", "exercise", "training", "membership", "strength"]),
    ("yoga", &["yoga", "meditation", "mindfulness", "wellness", "pilates", "retreat"]),
    (
        "cafe",
        &["coffee", "cafe", "espresso", "barista", "latte", "tea", "brunch", "bakery"],
    ),
    ("coffee", &["coffee", "espresso", "barista", "roaster", "latte", "beans"]),
    (
        "restaurant",
        &[
            "restaurant", "food", "dining", "menu", "chef", "cuisine", "takeout", "delivery",
            "brunch",
        ],
    ),
    ("food", &["food", "recipe", "dining", "grocery", "organic", "snack", "meal"]),
    (
        "bakery",
        &["bakery", "bread", "pastry", "sourdough", "cake", "baking", "dessert"],
    ),
    (
        "beauty",
        &["beauty", "skincare", "makeup", "cosmetics", "salon", "spa", "haircare"],
    ),
    ("salon", &["salon", "hair", "stylist", "barber", "nails", "beauty", "spa"]),
    (
        "fashion",
        &["fashion", "apparel", "clothing", "style", "boutique", "thrift", "sneakers"],
    ),
    (
        "retail",
        &["retail", "shopping", "boutique", "storefront", "inventory", "checkout"],
    ),
    (
        "tech",
        &["tech", "software", "saas", "cloud", "cybersecurity", "app", "developer", "data"],
    ),
    (
        "real estate",
        &["housing", "mortgage", "property", "realtor", "rental", "home"],
    ),
    ("health", &["health", "wellness", "clinic", "nutrition", "mental", "telehealth"]),
    ("pet", &["pet", "dog", "cat", "grooming", "veterinary", "adoption"]),
    (
        "travel",
        &["travel", "tourism", "hotel", "booking", "vacation", "airbnb", "flight"],
    ),
    (
        "education",
        &["education", "tutoring", "course", "learning", "school", "training"],
    ),
    ("automotive", &["car", "auto", "dealership", "electric", "vehicle", "repair"]),
];

/// Stateless after construction; shared by reference across passes.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    blacklist: HashSet<String>,
    business: HashSet<String>,
    categories: BTreeMap<String, Vec<String>>,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl RelevanceFilter {
    pub fn new() -> Self {
        Self {
            blacklist: to_set(BLACKLIST),
            business: to_set(BUSINESS_VOCABULARY),
            categories: CATEGORY_KEYWORDS
                .iter()
                .map(|(category, keywords)| {
                    (
                        category.to_string(),
                        keywords.iter().map(|k| k.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Add or extend a category's keyword list.
    pub fn with_category(mut self, category: &str, keywords: &[&str]) -> Self {
        self.categories
            .entry(category.trim().to_lowercase())
            .or_default()
            .extend(keywords.iter().map(|k| k.trim().to_lowercase()));
        self
    }

    /// Whether `term` belongs in a bundle for `category`. Blacklisted terms are
    /// rejected for every category.
    pub fn is_relevant(&self, term: &str, category: &str) -> bool {
        let term = normalize(term);
        if term.is_empty() || self.is_blacklisted(&term) {
            return false;
        }
        if matches_vocabulary(&self.business, &term) {
            return true;
        }

        let category = normalize(category);
        if self
            .category_keywords(&category)
            .any(|keyword| matches_keyword(&term, keyword))
        {
            return true;
        }

        !category.is_empty() && (term.contains(&category) || category.contains(&term))
    }

    pub fn is_blacklisted(&self, term: &str) -> bool {
        matches_vocabulary(&self.blacklist, &normalize(term))
    }

    /// Keywords of every table entry whose key appears as whole words in `category`.
    pub fn category_keywords<'a>(
        &'a self,
        category: &str,
    ) -> impl Iterator<Item = &'a String> + 'a {
        let padded = format!(" {} ", words(category).join(" "));
        self.categories
            .iter()
            .filter(move |(key, _)| padded.contains(&format!(" {key} ")))
            .flat_map(|(_, keywords)| keywords.iter())
    }
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect()
}

fn to_set(list: &[&str]) -> HashSet<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn normalize(term: &str) -> String {
    term.trim().trim_start_matches('#').trim().to_lowercase()
}

/// Whole-term match, or any single word matching singular or `s`-plural.
fn matches_vocabulary(vocabulary: &HashSet<String>, term: &str) -> bool {
    if vocabulary.contains(term) {
        return true;
    }
    words(term).into_iter().any(|word| {
        vocabulary.contains(word)
            || word
                .strip_suffix('s')
                .is_some_and(|singular| vocabulary.contains(singular))
    })
}

/// Keyword found as whole words of the term. Single-word keywords also match
/// an `s`-plural word.
fn matches_keyword(term: &str, keyword: &str) -> bool {
    if term == keyword {
        return true;
    }
    let term_words = words(term);
    if keyword.contains(' ') {
        let padded = format!(" {} ", term_words.join(" "));
        return padded.contains(&format!(" {keyword} "));
    }
    term_words
        .into_iter()
        .any(|word| word == keyword || word.strip_suffix('s') == Some(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATEGORIES: &[&str] = &["fitness", "cafe", "bakery", "tech", "politics", "", "unknown"];

    #[test]
    fn blacklisted_terms_are_never_relevant() {
        let filter = RelevanceFilter::new();
        for category in CATEGORIES {
            assert!(!filter.is_relevant("election", category), "election in {category}");
            assert!(!filter.is_relevant("Elections", category));
            assert!(!filter.is_relevant("#Oscars", category));
            assert!(!filter.is_relevant("movie business", category));
        }
    }

    #[test]
    fn category_keywords_make_terms_relevant() {
        let filter = RelevanceFilter::new();
        assert!(filter.is_relevant("workout", "fitness"));
        assert!(filter.is_relevant("workouts", "Fitness"));
        assert!(filter.is_relevant("espresso", "coffee shop"));
        assert!(!filter.is_relevant("workout", "bakery"));
        assert!(filter.is_relevant("yoga studio", "fitness"));
        assert!(filter.is_relevant("#Cats", "pet"));
    }

    #[test]
    fn short_keywords_do_not_match_inside_other_words() {
        let filter = RelevanceFilter::new();
        assert!(!filter.is_relevant("vacation", "pet"));
        assert!(!filter.is_relevant("education", "pet"));
        assert!(!filter.is_relevant("happy", "tech"));
        assert!(!filter.is_relevant("scar", "automotive"));
        assert!(!filter.is_relevant("careers", "automotive"));
        assert!(!filter.is_relevant("homeworkout", "gym"));
    }

    #[test]
    fn multi_word_keywords_match_whole_phrases() {
        let filter = RelevanceFilter::new().with_category("florist", &["wedding flowers"]);
        assert!(filter.is_relevant("spring wedding flowers", "florist"));
        assert!(!filter.is_relevant("wedding flowerbeds", "florist"));
    }

    #[test]
    fn marketing_terms_survive_entertainment_phrases() {
        let filter = RelevanceFilter::new();
        assert!(filter.is_relevant("marketing campaign", "retail"));
        assert!(filter.is_relevant("product tour", "tech"));
        assert!(!filter.is_relevant("concert tour", "retail"));
        assert!(!filter.is_relevant("election campaign", "retail"));
        assert!(!filter.is_relevant("Feature Film", "cafe"));
    }

    #[test]
    fn business_vocabulary_is_relevant_everywhere() {
        let filter = RelevanceFilter::new();
        assert!(filter.is_relevant("innovation", "bakery"));
        assert!(filter.is_relevant("customers", "pet"));
        assert!(filter.is_relevant("supply chain", "unknown"));
    }

    #[test]
    fn shared_substring_with_category_is_relevant() {
        let filter = RelevanceFilter::new();
        assert!(filter.is_relevant("florists", "florist"));
        assert!(filter.is_relevant("tattoo", "tattoo parlor"));
        assert!(!filter.is_relevant("weather", "florist"));
        assert!(!filter.is_relevant("weather", ""));
    }

    #[test]
    fn custom_categories_extend_the_table() {
        let filter = RelevanceFilter::new().with_category("florist", &["bouquet", "wedding"]);
        assert!(filter.is_relevant("bouquet", "florist"));
        assert!(!filter.is_relevant("bouquet", "bakery"));
    }

    #[test]
    fn blank_terms_are_irrelevant() {
        let filter = RelevanceFilter::new();
        assert!(!filter.is_relevant("   ", "fitness"));
        assert!(!filter.is_relevant("#", "fitness"));
    }
}
