//! Layout block synthesis.
//!
//! A layout block is one entry of the field-group document's `layouts`
//! mapping, produced as raw text lines ready to be spliced into an open
//! mapping (hence the trailing comma on the last line).
//!
//! Keys are random strings over `[a-zA-Z]`: 14 characters for the layout,
//! 8 for its clone sub-field. No collision check is made against existing
//! keys. With 52^14 possible layout keys, uniqueness is a probabilistic
//! guarantee and not an invariant of the document.

use crate::manifest::PackageManifest;
use rand::Rng;

/// Length of the generated layout key.
pub const LAYOUT_KEY_LEN: usize = 14;

/// Length of the random part of the clone sub-field key.
pub const FIELD_KEY_LEN: usize = 8;

const KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random string of `len` ASCII letters.
pub fn random_key<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| KEY_ALPHABET[rng.random_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

/// A synthesized layout entry. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutBlock {
    key: String,
    field_key: String,
    name: String,
    label: String,
    clone_group: String,
}

impl LayoutBlock {
    /// Generate a block for `manifest` using the thread-local RNG, which is
    /// seeded from the OS once per thread.
    pub fn generate(manifest: &PackageManifest) -> Self {
        Self::generate_with(manifest, &mut rand::rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(manifest: &PackageManifest, rng: &mut R) -> Self {
        let key = random_key(rng, LAYOUT_KEY_LEN);
        let field_key = format!("field_{}", random_key(rng, FIELD_KEY_LEN));
        Self {
            key,
            field_key,
            name: manifest.key.clone(),
            label: manifest.name.clone(),
            clone_group: manifest.clone_group.clone(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Display label, used as the sort key inside the layouts mapping.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The block as unindented lines; the last line ends with `},`.
    pub fn lines(&self) -> Vec<String> {
        let key = quote(&self.key);
        let field_key = quote(&self.field_key);
        let name = quote(&self.name);
        let label = quote(&self.label);
        let clone_group = quote(&self.clone_group);

        vec![
            format!("{key}: {{"),
            format!("    \"key\": {key},"),
            format!("    \"name\": {name},"),
            format!("    \"label\": {label},"),
            "    \"display\": \"block\",".to_string(),
            "    \"sub_fields\": [".to_string(),
            "        {".to_string(),
            format!("            \"key\": {field_key},"),
            "            \"label\": \"Content\",".to_string(),
            "            \"name\": \"ctn\",".to_string(),
            "            \"aria-label\": \"\",".to_string(),
            "            \"type\": \"clone\",".to_string(),
            "            \"instructions\": \"\",".to_string(),
            "            \"required\": 0,".to_string(),
            "            \"conditional_logic\": 0,".to_string(),
            "            \"wrapper\": {".to_string(),
            "                \"width\": \"\",".to_string(),
            "                \"class\": \"\",".to_string(),
            "                \"id\": \"\"".to_string(),
            "            },".to_string(),
            "            \"clone\": [".to_string(),
            format!("                {clone_group}"),
            "            ],".to_string(),
            "            \"display\": \"seamless\",".to_string(),
            "            \"layout\": \"block\",".to_string(),
            "            \"prefix_label\": 0,".to_string(),
            "            \"prefix_name\": 0".to_string(),
            "        }".to_string(),
            "    ],".to_string(),
            "    \"min\": \"\",".to_string(),
            "    \"max\": \"\"".to_string(),
            "},".to_string(),
        ]
    }
}

/// JSON string literal for `value`, escaping quotes and control characters.
fn quote(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ContentKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn manifest() -> PackageManifest {
        PackageManifest {
            key: "faq".to_string(),
            name: "FAQ".to_string(),
            clone_group: "group_63f5d7a1b2c3d".to_string(),
            contents: ContentKind::Layout,
            modifications: Vec::new(),
        }
    }

    #[test]
    fn test_random_key_alphabet_and_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let key = random_key(&mut rng, LAYOUT_KEY_LEN);
        assert_eq!(key.len(), LAYOUT_KEY_LEN);
        assert!(key.chars().all(|c| c.is_ascii_alphabetic()));
    }

    #[test]
    fn test_block_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        let block = LayoutBlock::generate_with(&manifest(), &mut rng);
        let lines = block.lines();

        assert_eq!(lines.len(), 32);
        assert_eq!(lines[0], format!("\"{}\": {{", block.key()));
        assert_eq!(lines[1], format!("    \"key\": \"{}\",", block.key()));
        assert_eq!(lines[2], "    \"name\": \"faq\",");
        assert_eq!(lines[3], "    \"label\": \"FAQ\",");
        assert!(lines[7].starts_with("            \"key\": \"field_"));
        assert_eq!(lines[21], "                \"group_63f5d7a1b2c3d\"");
        assert_eq!(lines.last().map(String::as_str), Some("},"));
    }

    #[test]
    fn test_layout_and_field_keys_are_independent() {
        let mut rng = StdRng::seed_from_u64(1);
        let block = LayoutBlock::generate_with(&manifest(), &mut rng);
        assert_ne!(&block.field_key["field_".len()..], &block.key[..FIELD_KEY_LEN]);
    }

    #[test]
    fn test_label_is_escaped() {
        let mut manifest = manifest();
        manifest.name = "Quote \"Block\"".to_string();
        let block = LayoutBlock::generate(&manifest);
        assert_eq!(block.lines()[3], r#"    "label": "Quote \"Block\"","#);
        assert_eq!(block.label(), "Quote \"Block\"");
    }

    #[test]
    fn test_block_body_is_valid_json() {
        let block = LayoutBlock::generate(&manifest());
        let mut text = block.lines().join("\n");
        text.pop(); // trailing comma
        let parsed: serde_json::Value = serde_json::from_str(&format!("{{{text}}}")).unwrap();
        assert_eq!(parsed[block.key()]["sub_fields"][0]["type"], "clone");
    }
}
