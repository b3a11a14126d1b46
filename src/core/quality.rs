//! QA_PIXEL bit decoding
//!
//! Collection-2 QA_PIXEL packs independent flags into a 16-bit word. Bit
//! positions below are 1-indexed from the least significant bit:
//!
//! | bit | flag          |
//! |-----|---------------|
//! | 1   | fill          |
//! | 2   | dilated cloud |
//! | 3   | cirrus        |
//! | 4   | cloud         |
//! | 5   | cloud shadow  |
//! | 6   | snow          |
//! | 8   | water         |
//!
//! Rules are applied in table order and later rules overwrite earlier ones,
//! so the position of a rule in [`QUALITY_RULES`] is its precedence.

use crate::types::{QualityCategory, QualityMask, SstError, SstResult};
use ndarray::Array2;
use num_traits::PrimInt;

/// One step of the override chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityRule {
    /// 1-indexed bit position
    pub bit: u8,
    pub category: QualityCategory,
    /// When false the rule only claims pixels still in the default category
    pub overrides: bool,
}

impl QualityRule {
    const fn new(bit: u8, category: QualityCategory) -> Self {
        Self {
            bit,
            category,
            overrides: true,
        }
    }
}

/// Category every pixel starts from
pub const DEFAULT_CATEGORY: QualityCategory = QualityCategory::Land;

/// Ordered override chain, lowest precedence first
pub const QUALITY_RULES: [QualityRule; 7] = [
    QualityRule::new(8, QualityCategory::Water),
    QualityRule::new(2, QualityCategory::Cloud),
    QualityRule::new(3, QualityCategory::Cloud),
    QualityRule::new(4, QualityCategory::Cloud),
    // Shadow must come after the cloud bits
    QualityRule::new(5, QualityCategory::CloudShadow),
    QualityRule::new(6, QualityCategory::Snow),
    QualityRule::new(1, QualityCategory::Outside),
];

/// Widest QA word a rule may address (`RawBand` samples are u16)
pub const MAX_RULE_BIT: u8 = 16;

/// Test a 1-indexed bit; positions outside the sample width are never set
#[inline]
pub fn bit_set<T: PrimInt>(value: T, bit: u8) -> bool {
    let width = std::mem::size_of::<T>() * 8;
    if bit == 0 || bit as usize > width {
        return false;
    }
    (value >> (bit as usize - 1)) & T::one() == T::one()
}

/// Category for a single QA word under `rules`
pub fn classify_pixel<T: PrimInt>(value: T, rules: &[QualityRule]) -> QualityCategory {
    rules.iter().fold(DEFAULT_CATEGORY, |current, rule| {
        let claimable = rule.overrides || current == DEFAULT_CATEGORY;
        if claimable && bit_set(value, rule.bit) {
            rule.category
        } else {
            current
        }
    })
}

/// Decoder from QA_PIXEL words to quality categories
pub struct QualityClassifier {
    rules: Vec<QualityRule>,
}

impl Default for QualityClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityClassifier {
    /// Classifier with the standard Collection-2 rule chain
    pub fn new() -> Self {
        Self {
            rules: QUALITY_RULES.to_vec(),
        }
    }

    /// Classifier with a custom rule chain
    ///
    /// Every rule must address a bit in `1..=16`.
    pub fn with_rules(rules: Vec<QualityRule>) -> SstResult<Self> {
        if let Some(rule) = rules.iter().find(|r| !(1..=MAX_RULE_BIT).contains(&r.bit)) {
            return Err(SstError::InvalidParameter(format!(
                "QA rule bit {} outside 1..={}",
                rule.bit, MAX_RULE_BIT
            )));
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[QualityRule] {
        &self.rules
    }

    /// Decode a QA raster into a fresh category mask of the same shape
    pub fn classify<T: PrimInt>(&self, qa: &Array2<T>) -> QualityMask {
        log::debug!("Decoding {:?} QA raster with {} rules", qa.dim(), self.rules.len());

        let mask = qa.mapv(|v| classify_pixel(v, &self.rules).code());

        log_category_counts(&mask);
        mask
    }

    /// Parallel decoding using Rayon
    #[cfg(feature = "parallel")]
    pub fn classify_parallel<T: PrimInt + Send + Sync>(&self, qa: &Array2<T>) -> QualityMask {
        use ndarray::Zip;

        log::debug!("Decoding {:?} QA raster in parallel", qa.dim());

        let rules = &self.rules;
        let mask = Zip::from(qa).par_map_collect(|&v| classify_pixel(v, rules).code());

        log_category_counts(&mask);
        mask
    }
}

/// Decode `qa` with the standard rule chain
pub fn classify<T: PrimInt>(qa: &Array2<T>) -> QualityMask {
    QualityClassifier::new().classify(qa)
}

/// Number of pixels in each category, indexed by category code
pub fn category_counts(mask: &QualityMask) -> [usize; 6] {
    let mut counts = [0usize; 6];
    for &code in mask.iter() {
        if let Some(slot) = counts.get_mut(code as usize) {
            *slot += 1;
        }
    }
    counts
}

fn log_category_counts(mask: &QualityMask) {
    let counts = category_counts(mask);
    log::info!(
        "QA classes: land={}, water={}, shadow={}, snow={}, cloud={}, outside={}",
        counts[0], counts[1], counts[2], counts[3], counts[4], counts[5]
    );
}
