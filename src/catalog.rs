//! Product catalog built from the product image file names.
//!
//! Files are named `<Category>_<Name>.png`; a trailing single letter
//! (`<Category>_<Name>_a.png`) marks an extra image of the same product.
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const IMAGE_DIR: &str = "/ProductImages";
const DEFAULT_PRICE: u32 = 40;

pub const PRODUCT_IMAGE_FILES: &[&str] = &[
    "420_Grinder.png",
    "420_Grinder_a.png",
    "Ancient_Gems.png",
    "Ancient_Pyramids.png",
    "Collectible_LabubuBuddha.png",
    "Collectible_Luffy.png",
    "Collectible_MechaPikachu.png",
    "Custom_1.png",
    "Geometrics_GeometryCube.png",
    "Household_PhoneStand.png",
    "Household_Vase.png",
    "Hypebeast_AstronauntKaws.png",
    "Hypebeast_Bearbrick.png",
    "Hypebeast_Biggie.png",
    "Hypebeast_ChromeHeartsKeychain.png",
    "Hypebeast_KawKeychain.png",
    "Hypebeast_KawsSitting.png",
    "Hypebeast_NikeKaws.png",
    "Jewelry_Crown.png",
    "Sculptures_Nefertiti.png",
    "Web3_BitcoinChain.png",
    "Web3_BitcoinSign.png",
    "Web3_BoredApe.png",
    "Web3_SatoshiStatue.png",
];

/// Every product generated from `PRODUCT_IMAGE_FILES`, sorted by category
/// then display name
pub static ALL_PRODUCTS: Lazy<Vec<CatalogEntry>> = Lazy::new(|| generate(PRODUCT_IMAGE_FILES));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub category: String,
    /// whole gold
    pub price: u32,
    pub description: String,
    /// first image is the main one
    pub images: Vec<String>,
}

impl CatalogEntry {
    pub fn image(&self) -> &str {
        self.images.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, PartialEq)]
struct ParsedFilename<'a> {
    category: &'a str,
    product_name: String,
    is_additional: bool,
}

impl ParsedFilename<'_> {
    fn base_key(&self) -> String {
        format!("{}_{}", self.category, self.product_name)
    }
}

fn parse_image_filename(filename: &str) -> Option<ParsedFilename<'_>> {
    let stem = filename.strip_suffix(".png").unwrap_or(filename);
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 2 || parts[0].is_empty() {
        return None;
    }
    let last = parts[parts.len() - 1];
    let is_additional =
        parts.len() > 2 && last.len() == 1 && last.chars().all(|c| c.is_ascii_alphabetic());
    let name_parts = if is_additional {
        &parts[1..parts.len() - 1]
    } else {
        &parts[1..]
    };
    Some(ParsedFilename {
        category: parts[0],
        product_name: name_parts.join("_"),
        is_additional,
    })
}

/// Split compound names into words: "LabubuBuddha" -> "Labubu Buddha",
/// "NFTArt" -> "NFT Art"
pub fn format_display_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || (prev.is_ascii_uppercase() && next_is_lower) {
                out.push(' ');
            }
        }
        out.push(c);
    }
    out.trim().to_string()
}

fn describe(category: &str, display_name: &str) -> String {
    match category {
        "420" => format!("Premium 3D-printed {display_name}. Perfect for enthusiasts."),
        "Ancient" => format!(
            "A beautiful 3D-printed replica of {display_name}. Bring ancient history to life."
        ),
        "Collectible" => format!(
            "Highly detailed 3D-printed {display_name} collectible figure. A must-have for collectors."
        ),
        "Custom" => "Custom 3D-printed design. Unique and one-of-a-kind.".to_string(),
        "Geometrics" => {
            format!("Precision 3D-printed {display_name}. Modern geometric design.")
        }
        "Household" => format!("Functional 3D-printed {display_name}. Practical and stylish."),
        "Hypebeast" => format!(
            "Exclusive 3D-printed {display_name}. Street culture meets 3D printing."
        ),
        "Jewelry" => format!(
            "Elegant 3D-printed {display_name}. Statement piece for any collection."
        ),
        "Sculptures" => format!(
            "Artistic 3D-printed {display_name} sculpture. Museum-quality design."
        ),
        "Web3" => format!(
            "3D-printed {display_name} celebrating blockchain culture. For crypto enthusiasts."
        ),
        _ => format!("Premium 3D-printed {display_name}."),
    }
}

fn price_for(category: &str) -> u32 {
    match category {
        "420" => 30,
        "Ancient" => 40,
        "Collectible" => 50,
        "Custom" => 80,
        "Geometrics" => 35,
        "Household" => 25,
        "Hypebeast" => 60,
        "Jewelry" => 45,
        "Sculptures" => 55,
        "Web3" => 50,
        _ => DEFAULT_PRICE,
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Group image files into products. Files that don't follow the naming
/// scheme are skipped.
pub fn generate(files: &[&str]) -> Vec<CatalogEntry> {
    // (base key, parsed name, images) in first-seen order
    let mut groups: Vec<(String, ParsedFilename<'_>, Vec<String>)> = Vec::new();
    for filename in files {
        let Some(parsed) = parse_image_filename(filename) else {
            log::warn!("skipping product image with unexpected name: {}", filename);
            continue;
        };
        let key = parsed.base_key();
        let image = format!("{IMAGE_DIR}/{filename}");
        match groups.iter_mut().find(|(existing, _, _)| *existing == key) {
            Some((_, _, images)) => images.push(image),
            None => groups.push((key, parsed, vec![image])),
        }
    }

    let mut products: Vec<CatalogEntry> = groups
        .into_iter()
        .map(|(key, parsed, images)| {
            let display_name = format_display_name(&parsed.product_name);
            CatalogEntry {
                id: key.to_lowercase().replace('_', "-"),
                description: describe(parsed.category, &display_name),
                price: price_for(parsed.category),
                category: parsed.category.to_string(),
                name: parsed.product_name,
                display_name,
                images,
            }
        })
        .collect();

    products.sort_by(|a, b| {
        compare_text(&a.category, &b.category)
            .then_with(|| compare_text(&a.display_name, &b.display_name))
    });
    products
}

pub fn products_in(category: &str) -> Vec<CatalogEntry> {
    ALL_PRODUCTS
        .iter()
        .filter(|product| product.category == category)
        .cloned()
        .collect()
}

/// Distinct categories, sorted
pub fn categories() -> Vec<&'static str> {
    let mut categories: Vec<&'static str> = ALL_PRODUCTS
        .iter()
        .map(|product| product.category.as_str())
        .collect();
    categories.sort_by(|a, b| compare_text(a, b));
    categories.dedup();
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(id: &str) -> Option<&'static CatalogEntry> {
        ALL_PRODUCTS.iter().find(|product| product.id == id)
    }

    #[test]
    fn parses_plain_and_additional_images() {
        let plain = parse_image_filename("Collectible_LabubuBuddha.png").unwrap();
        assert_eq!(plain.category, "Collectible");
        assert_eq!(plain.product_name, "LabubuBuddha");
        assert!(!plain.is_additional);

        let extra = parse_image_filename("420_Grinder_a.png").unwrap();
        assert_eq!(extra.product_name, "Grinder");
        assert!(extra.is_additional);
        assert_eq!(extra.base_key(), "420_Grinder");
    }

    #[test]
    fn single_digit_suffix_is_a_name() {
        let custom = parse_image_filename("Custom_1.png").unwrap();
        assert_eq!(custom.product_name, "1");
        assert!(!custom.is_additional);
    }

    #[test]
    fn rejects_names_without_category() {
        assert_eq!(parse_image_filename("Loose.png"), None);
    }

    #[test]
    fn display_names_split_words() {
        assert_eq!(format_display_name("LabubuBuddha"), "Labubu Buddha");
        assert_eq!(format_display_name("PhoneStand"), "Phone Stand");
        assert_eq!(format_display_name("ChromeHeartsKeychain"), "Chrome Hearts Keychain");
        assert_eq!(format_display_name("NFTArt"), "NFT Art");
        assert_eq!(format_display_name("Luffy"), "Luffy");
    }

    #[test]
    fn additional_images_join_their_product() {
        let grinder = find("420-grinder").expect("grinder generated");
        assert_eq!(
            grinder.images,
            vec![
                "/ProductImages/420_Grinder.png".to_string(),
                "/ProductImages/420_Grinder_a.png".to_string()
            ]
        );
        assert_eq!(grinder.image(), "/ProductImages/420_Grinder.png");
        assert_eq!(grinder.price, 30);
    }

    #[test]
    fn catalog_has_one_entry_per_product() {
        assert_eq!(ALL_PRODUCTS.len(), PRODUCT_IMAGE_FILES.len() - 1);
        assert_eq!(products_in("Hypebeast").len(), 7);
        assert_eq!(products_in("Web3").len(), 4);
        assert!(products_in("Nonexistent").is_empty());
    }

    #[test]
    fn products_sorted_by_category_then_name() {
        let web3: Vec<String> = products_in("Web3")
            .into_iter()
            .map(|product| product.display_name)
            .collect();
        assert_eq!(
            web3,
            vec!["Bitcoin Chain", "Bitcoin Sign", "Bored Ape", "Satoshi Statue"]
        );
        assert_eq!(ALL_PRODUCTS.first().unwrap().category, "420");
        assert_eq!(ALL_PRODUCTS.last().unwrap().category, "Web3");
    }

    #[test]
    fn descriptions_follow_category() {
        let nefertiti = find("sculptures-nefertiti").unwrap();
        assert_eq!(
            nefertiti.description,
            "Artistic 3D-printed Nefertiti sculpture. Museum-quality design."
        );
        assert_eq!(
            find("custom-1").unwrap().description,
            "Custom 3D-printed design. Unique and one-of-a-kind."
        );
    }

    #[test]
    fn categories_are_distinct_and_sorted() {
        let categories = categories();
        assert_eq!(categories.first(), Some(&"420"));
        assert!(categories.contains(&"Sculptures"));
        assert_eq!(categories.len(), 10);
    }
}
