//! Material reference matrix: per-material GHG intensity, recyclability,
//! and a 0-100 reference score used to enrich scoring-service output.

use anyhow::Result;

const BUILTIN_MATRIX: &str = include_str!("../data/sustainability_matrix.csv");

/// Jaro-Winkler floor for fuzzy material-name matches.
const FUZZY_THRESHOLD: f64 = 0.88;

#[derive(Debug, Clone)]
pub struct MaterialRef {
    pub material: String,
    pub domain_category: String,
    pub unit: String,
    pub ghg_kgco2e_per_kg: f64,
    pub recyclable: String,
    pub notes: String,
    pub score_0_100: f64,
}

#[derive(Debug, Clone)]
pub struct MaterialMatrix {
    rows: Vec<MaterialRef>,
}

impl MaterialMatrix {
    /// Load the embedded reference dataset.
    pub fn builtin() -> Self {
        // The embedded CSV is checked in tests; a parse failure here is a
        // packaging bug, so fall back to an empty matrix rather than panic.
        match Self::from_csv(BUILTIN_MATRIX) {
            Ok(matrix) => matrix,
            Err(e) => {
                tracing::error!(error = %e, "Builtin material matrix failed to parse");
                Self { rows: Vec::new() }
            }
        }
    }

    /// Parse a CSV document with a header row. Malformed rows are skipped
    /// with a warning; quoted fields may contain commas.
    pub fn from_csv(csv: &str) -> Result<Self> {
        let mut lines = csv.trim().lines();
        let _header = lines
            .next()
            .ok_or_else(|| anyhow::anyhow!("matrix CSV is empty"))?;

        let mut rows = Vec::new();
        for (i, line) in lines.enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields = split_csv_line(line);
            if fields.len() < 7 {
                tracing::warn!(line = i + 2, "Skipping malformed matrix row");
                continue;
            }
            rows.push(MaterialRef {
                material: fields[0].clone(),
                domain_category: fields[1].clone(),
                unit: fields[2].clone(),
                ghg_kgco2e_per_kg: fields[3].parse().unwrap_or(0.0),
                recyclable: fields[4].clone(),
                notes: fields[5].clone(),
                score_0_100: fields[6].parse().unwrap_or(0.0),
            });
        }

        tracing::info!(materials = rows.len(), "Material matrix loaded");
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[MaterialRef] {
        &self.rows
    }

    /// Resolve an extracted material name against the matrix. Exact and
    /// substring matches on the normalized name win; Jaro-Winkler similarity
    /// is the fallback for spelling drift ("polyster", "aluminium").
    pub fn lookup(&self, name: &str) -> Option<&MaterialRef> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        if let Some(row) = self.rows.iter().find(|r| r.material == needle) {
            return Some(row);
        }

        // Prefer the longest containment so "recycled cotton" does not
        // resolve to "cotton".
        if let Some(row) = self
            .rows
            .iter()
            .filter(|r| needle.contains(&r.material) || r.material.contains(&needle))
            .max_by_key(|r| r.material.len())
        {
            return Some(row);
        }

        self.rows
            .iter()
            .map(|r| (r, strsim::jaro_winkler(&needle, &r.material)))
            .filter(|(_, sim)| *sim >= FUZZY_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(r, _)| r)
    }

    /// Compact text excerpt of the matrix for prompt construction.
    pub fn prompt_excerpt(&self, limit: usize) -> String {
        self.rows
            .iter()
            .take(limit)
            .map(|r| {
                format!(
                    "{}: score {} / 100, recyclable: {}, {} kgCO2e/kg",
                    r.material, r.score_0_100, r.recyclable, r.ghg_kgco2e_per_kg
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Split one CSV line, honoring double-quoted fields.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}
