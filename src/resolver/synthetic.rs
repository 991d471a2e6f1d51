use crate::domain::brand_label;
use crate::gaps::types::GapRecord;

/// Records generated per competitor.
pub const RECORDS_PER_COMPETITOR: usize = 12;

/// Base (keyword, volume, difficulty) rows cycled through per competitor.
const TEMPLATES: [(&str, u64, u32); 15] = [
    ("keyword research tool", 2400, 45),
    ("seo audit checklist", 1300, 28),
    ("backlink checker free", 3600, 52),
    ("how to improve domain authority", 880, 35),
    ("local seo tips", 720, 22),
    ("technical seo guide", 590, 41),
    ("content gap analysis", 390, 18),
    ("competitor keyword analysis", 480, 33),
    ("on page seo factors", 1000, 38),
    ("long tail keywords examples", 320, 15),
    ("site speed optimization", 1600, 57),
    ("schema markup generator", 210, 26),
    ("internal linking strategy", 170, 19),
    ("seo reporting template", 90, 64),
    ("search intent types", 260, 24),
];

/// Deterministic generator of plausible gaps used when no reliable data exists.
///
/// Keywords and their order are fixed; only the numeric jitter is random.
/// A seed makes the jitter reproducible too.
#[derive(Debug, Clone, Default)]
pub struct SyntheticFallback {
    seed: Option<u64>,
}

impl SyntheticFallback {
    pub fn new() -> Self {
        Self { seed: None }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    fn rng(&self) -> fastrand::Rng {
        match self.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        }
    }

    /// Produce exactly [`RECORDS_PER_COMPETITOR`] records for each competitor.
    pub fn synthesize(&self, competitors: &[String]) -> Vec<GapRecord> {
        self.synthesize_at_least(competitors, RECORDS_PER_COMPETITOR)
    }

    /// Produce `max(RECORDS_PER_COMPETITOR, min_per_competitor)` records for
    /// each competitor. The first twelve follow the same template cycle as
    /// [`SyntheticFallback::synthesize`].
    pub fn synthesize_at_least(&self, competitors: &[String], min_per_competitor: usize) -> Vec<GapRecord> {
        let per_competitor = min_per_competitor.max(RECORDS_PER_COMPETITOR);
        let mut rng = self.rng();
        let mut records = Vec::with_capacity(competitors.len() * per_competitor);

        for competitor in competitors {
            let brand = brand_label(competitor);
            for i in 0..per_competitor {
                let (base, volume, difficulty) = TEMPLATES[i % TEMPLATES.len()];
                let mut keyword = base.to_string();
                // Every third keyword carries the competitor name so lists
                // for different competitors don't fully overlap.
                if i % 3 == 0 {
                    keyword.push(' ');
                    keyword.push_str(brand);
                }
                let round = i / TEMPLATES.len();
                if round > 0 {
                    keyword.push_str(&format!(" {}", round + 1));
                }
                let volume = volume + rng.u64(0..300);
                let difficulty = (difficulty as i64 + rng.i64(-5..=5)).clamp(1, 100) as u32;
                records.push(GapRecord::new(&keyword, volume, difficulty, competitor, None));
            }
        }

        records
    }
}
