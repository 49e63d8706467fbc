//! Construction of the per-slice field dictionaries.

use indexmap::{IndexMap, IndexSet};

use crate::{
    err::{CodecError, DictKind},
    model::{Variant, FILTER},
    pbs::Fields,
};

use super::{format_string, sample_value, single_study, Selection};

/// Occurrence counter that remembers first-seen order.
#[derive(Debug, Default)]
struct Counter<K> {
    counts: IndexMap<K, usize>,
}

impl<K: std::hash::Hash + Eq> Counter<K> {
    fn add(&mut self, key: K) {
        *self.counts.entry(key).or_default() += 1;
    }

    /// Keys by descending count, ties in first-seen order.
    fn into_sorted(self) -> Vec<K> {
        let mut entries = self.counts.into_iter().collect::<Vec<_>>();
        // `sort_by` is stable and keeps first-seen order for equal counts.
        entries.sort_by(|(_, lhs), (_, rhs)| rhs.cmp(lhs));
        entries.into_iter().map(|(key, _)| key).collect()
    }
}

/// Build the dictionaries for `variants` under `selection`.
///
/// Every variant must have exactly one study; the result does not depend on the order of
/// variants beyond tie-breaking between entries of equal frequency.
pub fn build_fields(variants: &[Variant], selection: &Selection) -> Result<Fields, CodecError> {
    let mut filters = Counter::default();
    let mut info_keys = Counter::default();
    let mut formats = Counter::default();
    let mut gts = Counter::default();
    let mut key_sets: Counter<Vec<String>> = Counter::default();

    for variant in variants {
        let (study, file) = single_study(variant)?;

        let keys = if let Some(file) = file {
            if let Some(filter) = file.attributes.get(FILTER) {
                filters.add(filter.clone());
            }
            selection.info_keys(&file.attributes)
        } else {
            Vec::new()
        };
        for key in &keys {
            info_keys.add(key.to_string());
        }
        key_sets.add(keys.into_iter().map(str::to_string).collect());

        let positions = selection.format_positions(&study.format)?;
        let (format, with_gt) = format_string(&study.format, &positions);
        formats.add(format);
        if with_gt {
            for sample in &study.samples_data {
                gts.add(sample_value(sample, positions[0]).to_string());
            }
        }
    }

    let info_keys = info_keys.into_sorted();
    let default_info_keys = match key_sets.into_sorted().into_iter().next() {
        Some(key_set) => default_key_indices(&info_keys, &key_set)?,
        None => Vec::new(),
    };

    let fields = Fields {
        filters: filters.into_sorted(),
        info_keys,
        formats: formats.into_sorted(),
        gts: gts.into_sorted(),
        default_info_keys,
    };
    tracing::trace!(
        "built dictionaries: {} filters, {} info keys, {} formats, {} genotypes",
        fields.filters.len(),
        fields.info_keys.len(),
        fields.formats.len(),
        fields.gts.len()
    );
    Ok(fields)
}

/// Sorted dictionary indices of `key_set`.
fn default_key_indices(
    info_keys: &[String],
    key_set: &[String],
) -> Result<Vec<u32>, CodecError> {
    let mut indices = key_set
        .iter()
        .map(|key| {
            info_keys
                .iter()
                .position(|k| k == key)
                .map(|pos| pos as u32)
                .ok_or_else(|| CodecError::NotInDictionary {
                    kind: DictKind::Info,
                    value: key.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    indices.sort_unstable();
    Ok(indices)
}

/// Reverse lookup from dictionary values to their indices.
#[derive(Debug)]
pub struct FieldsLookup<'a> {
    filters: IndexSet<&'a str>,
    info_keys: IndexSet<&'a str>,
    formats: IndexSet<&'a str>,
    gts: IndexSet<&'a str>,
}

impl<'a> FieldsLookup<'a> {
    pub fn new(fields: &'a Fields) -> Self {
        fn index(values: &[String]) -> IndexSet<&str> {
            values.iter().map(String::as_str).collect()
        }

        Self {
            filters: index(&fields.filters),
            info_keys: index(&fields.info_keys),
            formats: index(&fields.formats),
            gts: index(&fields.gts),
        }
    }

    /// Index of `value` in the dictionary `kind`.
    pub fn index_of(&self, kind: DictKind, value: &str) -> Result<u32, CodecError> {
        let set = match kind {
            DictKind::Filter => &self.filters,
            DictKind::Info => &self.info_keys,
            DictKind::Format => &self.formats,
            DictKind::Genotype => &self.gts,
        };
        set.get_index_of(value)
            .map(|idx| idx as u32)
            .ok_or_else(|| CodecError::NotInDictionary {
                kind,
                value: value.to_string(),
            })
    }
}

/// Value at `index` in the dictionary `kind` of `fields`.
pub fn value_at(fields: &Fields, kind: DictKind, index: u32) -> Result<&str, CodecError> {
    let values = match kind {
        DictKind::Filter => &fields.filters,
        DictKind::Info => &fields.info_keys,
        DictKind::Format => &fields.formats,
        DictKind::Genotype => &fields.gts,
    };
    values
        .get(index as usize)
        .map(String::as_str)
        .ok_or(CodecError::IndexOutOfRange {
            kind,
            index,
            size: values.len(),
        })
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{build_fields, value_at, FieldsLookup};
    use crate::{
        codec::{testing::variant, Selection},
        err::{CodecError, DictKind},
        model::Variant,
    };

    fn example() -> Vec<Variant> {
        vec![
            variant(
                100,
                "A",
                "T",
                &[("FILTER", "q10"), ("QUAL", "20"), ("DP", "5")],
                &["GT", "DP"],
                &[&["0/1", "5"], &["0/0", "3"]],
            ),
            variant(
                105,
                "C",
                "G",
                &[("FILTER", "PASS"), ("DP", "8"), ("AC", "2")],
                &["GT"],
                &[&["1/1"], &["0/1"]],
            ),
            variant(
                110,
                "G",
                "GA",
                &[("FILTER", "PASS"), ("AC", "1"), ("DP", "2"), ("SRC", "x")],
                &["GT"],
                &[&["0/1"], &["0/1"]],
            ),
        ]
    }

    #[test]
    fn frequency_order_with_first_seen_ties() -> Result<(), anyhow::Error> {
        let fields = build_fields(&example(), &Selection::all())?;

        insta::assert_debug_snapshot!(fields.filters, @r###"
        [
            "PASS",
            "q10",
        ]
        "###);
        insta::assert_debug_snapshot!(fields.info_keys, @r###"
        [
            "DP",
            "AC",
        ]
        "###);
        assert_eq!(fields.formats, vec!["GT", "GT:DP"]);
        assert_eq!(fields.gts, vec!["0/1", "0/0", "1/1"]);
        // {AC, DP} is seen twice, {DP} once.
        assert_eq!(fields.default_info_keys, vec![0, 1]);

        Ok(())
    }

    #[test]
    fn deterministic() -> Result<(), anyhow::Error> {
        let selection = Selection::all().with_info(["DP"]);

        let first = build_fields(&example(), &selection)?;
        let second = build_fields(&example(), &selection)?;

        assert_eq!(first, second);
        assert_eq!(first.info_keys, vec!["DP"]);
        assert_eq!(first.default_info_keys, vec![0]);

        Ok(())
    }

    #[test]
    fn no_genotypes_without_leading_gt() -> Result<(), anyhow::Error> {
        let variants = vec![variant(100, "A", "T", &[], &["DP"], &[&["7"]])];

        let fields = build_fields(&variants, &Selection::all())?;

        assert_eq!(fields.formats, vec!["DP"]);
        assert!(fields.gts.is_empty());
        assert!(fields.default_info_keys.is_empty());

        Ok(())
    }

    #[test]
    fn empty_input() -> Result<(), anyhow::Error> {
        let fields = build_fields(&[], &Selection::all())?;

        assert_eq!(fields, Default::default());

        Ok(())
    }

    #[test]
    fn lookup_and_value_at() -> Result<(), anyhow::Error> {
        let fields = build_fields(&example(), &Selection::all())?;
        let lookup = FieldsLookup::new(&fields);

        assert_eq!(lookup.index_of(DictKind::Filter, "q10")?, 1);
        assert_eq!(lookup.index_of(DictKind::Genotype, "1/1")?, 2);
        assert_eq!(
            lookup.index_of(DictKind::Format, "DP:GT"),
            Err(CodecError::NotInDictionary {
                kind: DictKind::Format,
                value: "DP:GT".into(),
            })
        );
        assert_eq!(value_at(&fields, DictKind::Info, 1)?, "AC");
        assert!(matches!(
            value_at(&fields, DictKind::Filter, 9),
            Err(CodecError::IndexOutOfRange { size: 2, .. })
        ));

        Ok(())
    }
}
