//! Tab-separated inputs: gene populations and field tables of earlier runs.
//!
//! A population file has a header row `Gene x y z <payload columns...>` and
//! one gene per row, in genome order. Blank lines and `#` comments are
//! skipped. A field table has a `Gene\tField` header and one gene per row.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use sphere_test::{FieldTable, Gene, Population};

use crate::error::{FieldsError, Result};
use crate::statistics::{MotifGene, MotifSet, ProfileGene, ScalarGene, TaxonGene};

/// A gene type that can be built from one population row.
pub trait GeneRecord: Gene + Sized {
    /// Payload columns required after `Gene x y z`; `None` accepts any
    /// non-zero width fixed by the header.
    const PAYLOAD_COLUMNS: Option<usize>;

    /// Build a gene from its row. `order` is the row's index in genome order.
    fn from_record(
        name: String,
        position: Vec3,
        order: usize,
        payload: &[&str],
    ) -> std::result::Result<Self, String>;
}

fn parse_f64(column: &str, value: &str) -> std::result::Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("column '{}': invalid number '{}': {}", column, value, e))
}

impl GeneRecord for ScalarGene {
    const PAYLOAD_COLUMNS: Option<usize> = Some(1);

    fn from_record(
        name: String,
        position: Vec3,
        order: usize,
        payload: &[&str],
    ) -> std::result::Result<Self, String> {
        Ok(ScalarGene {
            name,
            position,
            value: parse_f64("value", payload[0])?,
            order,
        })
    }
}

impl GeneRecord for TaxonGene {
    const PAYLOAD_COLUMNS: Option<usize> = Some(1);

    fn from_record(
        name: String,
        position: Vec3,
        _order: usize,
        payload: &[&str],
    ) -> std::result::Result<Self, String> {
        let taxon = payload[0].trim();
        if taxon.is_empty() {
            return Err("empty taxon".to_string());
        }
        Ok(TaxonGene {
            name,
            position,
            taxon: Arc::from(taxon),
        })
    }
}

impl GeneRecord for MotifGene {
    const PAYLOAD_COLUMNS: Option<usize> = None;

    fn from_record(
        name: String,
        position: Vec3,
        _order: usize,
        payload: &[&str],
    ) -> std::result::Result<Self, String> {
        let mut motifs = MotifSet::new(payload.len());
        for (i, value) in payload.iter().enumerate() {
            let flag = value
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("motif column {}: invalid flag '{}': {}", i + 1, value, e))?;
            if flag != 0 {
                motifs.insert(i);
            }
        }
        Ok(MotifGene {
            name,
            position,
            motifs,
        })
    }
}

impl GeneRecord for ProfileGene {
    const PAYLOAD_COLUMNS: Option<usize> = None;

    fn from_record(
        name: String,
        position: Vec3,
        _order: usize,
        payload: &[&str],
    ) -> std::result::Result<Self, String> {
        let features = payload
            .iter()
            .enumerate()
            .map(|(i, v)| parse_f64(&format!("feature {}", i + 1), v))
            .collect::<std::result::Result<Vec<f64>, String>>()?;
        Ok(ProfileGene {
            name,
            position,
            features,
        })
    }
}

/// Non-empty, non-comment lines with their 1-based line numbers.
fn data_lines<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = (usize, std::io::Result<String>)> {
    reader
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| match line {
            Ok(l) => {
                let t = l.trim();
                !t.is_empty() && !t.starts_with('#')
            }
            Err(_) => true,
        })
}

/// Read a population from `reader`; `source` names it in error messages.
pub fn read_population<G, R>(reader: R, source: &Path) -> Result<Population<G>>
where
    G: GeneRecord,
    R: BufRead,
{
    let mut lines = data_lines(reader);
    let (header_line, header) = match lines.next() {
        Some((n, line)) => (n, line?),
        None => return Err(FieldsError::parse(source, 0, "missing header row")),
    };

    let header: Vec<&str> = header.split('\t').map(str::trim).collect();
    if header.len() < 5 || header[0] != "Gene" || header[1..4] != ["x", "y", "z"] {
        return Err(FieldsError::parse(
            source,
            header_line,
            "header must start with 'Gene\\tx\\ty\\tz' and name at least one payload column",
        ));
    }
    let payload_width = header.len() - 4;
    if let Some(expected) = G::PAYLOAD_COLUMNS {
        if payload_width != expected {
            return Err(FieldsError::parse(
                source,
                header_line,
                format!(
                    "expected {} payload column(s), header has {}",
                    expected, payload_width
                ),
            ));
        }
    }

    let mut genes = Vec::new();
    for (line_number, line) in lines {
        let line = line?;
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() != header.len() {
            return Err(FieldsError::parse(
                source,
                line_number,
                format!("expected {} columns, found {}", header.len(), columns.len()),
            ));
        }

        let mut coordinates = [0.0f32; 3];
        for (axis, value) in coordinates.iter_mut().enumerate() {
            *value = columns[axis + 1].trim().parse::<f32>().map_err(|e| {
                FieldsError::parse(
                    source,
                    line_number,
                    format!("invalid coordinate '{}': {}", columns[axis + 1], e),
                )
            })?;
        }

        let order = genes.len();
        let gene = G::from_record(
            columns[0].trim().to_string(),
            Vec3::from_array(coordinates),
            order,
            &columns[4..],
        )
        .map_err(|message| FieldsError::parse(source, line_number, message))?;
        genes.push(gene);
    }

    log::debug!(
        "Read {} genes with {} payload column(s) from {}",
        genes.len(),
        payload_width,
        source.display()
    );
    Ok(Population::new(genes)?)
}

/// Open and read a population file.
pub fn load_population<G: GeneRecord>(path: &Path) -> Result<Population<G>> {
    let file = File::open(path)?;
    read_population(BufReader::new(file), path)
}

/// Read a `Gene\tField` table as written by [`crate::report::write_fields`].
pub fn read_fields<R: BufRead>(reader: R, source: &Path) -> Result<FieldTable> {
    let mut lines = data_lines(reader);
    match lines.next() {
        Some((n, line)) => {
            let line = line?;
            let header: Vec<&str> = line.split('\t').map(str::trim).collect();
            if header != ["Gene", "Field"] {
                return Err(FieldsError::parse(source, n, "header must be 'Gene\\tField'"));
            }
        }
        None => return Err(FieldsError::parse(source, 0, "missing header row")),
    }

    let mut table = FieldTable::new();
    for (line_number, line) in lines {
        let line = line?;
        let columns: Vec<&str> = line.split('\t').map(str::trim).collect();
        if columns.len() != 2 {
            return Err(FieldsError::parse(
                source,
                line_number,
                format!("expected 2 columns, found {}", columns.len()),
            ));
        }
        table
            .entry(columns[1].to_string())
            .or_default()
            .insert(columns[0].to_string());
    }
    Ok(table)
}

pub fn load_fields(path: &Path) -> Result<FieldTable> {
    let file = File::open(path)?;
    read_fields(BufReader::new(file), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> &'static Path {
        Path::new("genes.tsv")
    }

    #[test]
    fn test_read_scalar_population() {
        let data = "# species counts\nGene\tx\ty\tz\tSpeciesCount\n\
                    A1\t0\t1\t2\t12\n\nB2\t3.5\t4\t5\t40\n";
        let population: Population<ScalarGene> =
            read_population(data.as_bytes(), source()).unwrap();
        assert_eq!(population.len(), 2);
        let b = population.gene(1);
        assert_eq!(b.name, "B2");
        assert_eq!(b.position, Vec3::new(3.5, 4.0, 5.0));
        assert_eq!(b.value, 40.0);
        assert_eq!(b.order, 1);
    }

    #[test]
    fn test_wrong_column_count_reports_line() {
        let data = "Gene\tx\ty\tz\tH3K4me3\tH3K27ac\nA\t0\t0\t0\t1\t2\nB\t0\t0\t0\t1\n";
        let err = read_population::<ProfileGene, _>(data.as_bytes(), source()).unwrap_err();
        match err {
            FieldsError::Parse { line, message, .. } => {
                assert_eq!(line, 3);
                assert!(message.contains("expected 6 columns, found 5"), "{}", message);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_payload_width_checked_against_gene_type() {
        let data = "Gene\tx\ty\tz\ta\tb\nA\t0\t0\t0\t1\t2\n";
        assert!(matches!(
            read_population::<ScalarGene, _>(data.as_bytes(), source()),
            Err(FieldsError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_read_motifs_and_taxa() {
        let data = "Gene\tx\ty\tz\tm1\tm2\tm3\nA\t0\t0\t0\t1\t0\t2\n";
        let population: Population<MotifGene> = read_population(data.as_bytes(), source()).unwrap();
        let motifs = &population.gene(0).motifs;
        assert_eq!(motifs.width(), 3);
        assert!(motifs.contains(0) && !motifs.contains(1) && motifs.contains(2));

        let data = "Gene\tx\ty\tz\tTaxon\nA\t0\t0\t0\tMammalia\n";
        let population: Population<TaxonGene> = read_population(data.as_bytes(), source()).unwrap();
        assert_eq!(population.gene(0).taxon.as_ref(), "Mammalia");
    }

    #[test]
    fn test_duplicate_gene_and_bad_number() {
        let data = "Gene\tx\ty\tz\tv\nA\t0\t0\t0\t1\nA\t1\t1\t1\t2\n";
        assert!(matches!(
            read_population::<ScalarGene, _>(data.as_bytes(), source()),
            Err(FieldsError::SphereTest(sphere_test::SphereTestError::DuplicateGene(_)))
        ));

        let data = "Gene\tx\ty\tz\tv\nA\t0\tnorth\t0\t1\n";
        assert!(matches!(
            read_population::<ScalarGene, _>(data.as_bytes(), source()),
            Err(FieldsError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_read_fields() {
        let data = "Gene\tField\ng1\tA\ng2\tA\ng3\tB\n";
        let table = read_fields(data.as_bytes(), Path::new("fields.tsv")).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["A"].len(), 2);
        assert!(table["B"].contains("g3"));

        assert!(read_fields("Name\tGroup\n".as_bytes(), Path::new("f.tsv")).is_err());
    }
}
