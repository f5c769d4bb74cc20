// src/test_fixtures.rs
//
// Shared inputs for unit tests: an 8-sequence query set with its true
// taxonomies and one classifier's assignments, plus two small BIOM tables.

pub const EXPECTED_TAXA: &str = "\
179419\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Lactobacillales; f__Lactobacillaceae; g__Lactobacillus; s__brevis
1117026\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Lactobacillales; f__Lactobacillaceae; g__Lactobacillus; s__brevis
192680\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Lactobacillales; f__Lactobacillaceae; g__Lactobacillus; s__ruminis
2562098\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Bacillales; f__Bacillaceae; g__Bacillus; s__foraminis
4308624\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Bacillales; f__Bacillaceae; g__Bacillus; s__cereus
102222\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Lactobacillales; f__Lactobacillaceae; g__Pediococcus; s__acidilactici
27815\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Lactobacillales; f__Lactobacillaceae; g__Pediococcus; s__acidilactici
1136710\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Lactobacillales; f__Lactobacillaceae; g__Pediococcus; s__damnosus
";

pub const OBSERVED_TAXA: &str = "\
#OTU ID\ttaxonomy\tconfidence
179419\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Lactobacillales; f__Lactobacillaceae; g__Lactobacillus; s__brevis\t1.0
1117026\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Lactobacillales; f__Lactobacillaceae; g__Lactobacillus\t0.9
192680\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Lactobacillales; f__Lactobacillaceae\t0.8
2562098\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Bacillales\t0.7
4308624\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Bacillales; f__Bacillaceae; g__Bacillus; s__cereus\t1.0
102222\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Bacillales; f__Bacillaceae; g__Bacillus; s__cereus\t1.0
27815\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Lactobacillales; f__Lactobacillaceae; g__Pediococcus\t0.9
1136710\tk__Bacteria; p__Firmicutes; c__Bacilli; o__Lactobacillales; f__Lactobacillaceae; g__Pediococcus\t0.9
";

/// Second column of a two-column fixture, in file order.
pub fn taxonomy_column(fixture: &str) -> Vec<String> {
    fixture
        .lines()
        .filter(|l| !l.starts_with('#') && !l.trim().is_empty())
        .map(|l| l.split('\t').nth(1).unwrap_or("").to_string())
        .collect()
}

/// 3 observations x 4 samples.
///   o1  1.0  2.0  3.0  4.0
///   o2  2.0  0.0  7.0  8.0
///   o3  9.0 10.0 11.0 12.0
pub const TABLE1: &str = r#"{"id": "None","format": "Biological Observation Matrix 1.0.0","format_url": "http://biom-format.org","type": "OTU table","generated_by": "greg","date": "2013-08-22T13:10:23.907145","matrix_type": "sparse","matrix_element_type": "float","shape": [3, 4],"data": [[0,0,1.0],[0,1,2.0],[0,2,3.0],[0,3,4.0],[1,0,2.0],[1,1,0.0],[1,2,7.0],[1,3,8.0],[2,0,9.0],[2,1,10.0],[2,2,11.0],[2,3,12.0]],"rows": [{"id": "o1", "metadata": {"domain": "Archaea"}},{"id": "o2", "metadata": {"domain": "Bacteria"}},{"id": "o3", "metadata": {"domain": "Bacteria"}}],"columns": [{"id": "s1", "metadata": {"country": "Peru", "pH": 4.2}},{"id": "s2", "metadata": {"country": "Peru", "pH": 5.2}},{"id": "s3", "metadata": {"country": "Peru", "pH": 5.0}},{"id": "s4", "metadata": {"country": "Peru", "pH": 4.9}}]}"#;

/// 2 observations x 4 samples.
///   o1  1.0  2.0  3.0  0.001
///   o3  9.0 10.0 11.0  0.0
pub const TABLE2: &str = r#"{"id": "None","format": "Biological Observation Matrix 1.0.0","format_url": "http://biom-format.org","type": "OTU table","generated_by": "greg","date": "2013-08-22T13:19:35.281188","matrix_type": "sparse","matrix_element_type": "float","shape": [2, 4],"data": [[0,0,1.0],[0,1,2.0],[0,2,3.0],[0,3,0.001],[1,0,9.0],[1,1,10.0],[1,2,11.0],[1,3,0.0]],"rows": [{"id": "o1", "metadata": {"domain": "Archaea"}},{"id": "o3", "metadata": {"domain": "Bacteria"}}],"columns": [{"id": "s1", "metadata": {"country": "Peru", "pH": 4.2}},{"id": "s2", "metadata": {"country": "Peru", "pH": 5.2}},{"id": "s3", "metadata": {"country": "Peru", "pH": 5.0}},{"id": "s4", "metadata": {"country": "Peru", "pH": 4.9}}]}"#;

/// Dense table with taxonomy metadata, some of it missing or shallow.
pub const TAXONOMY_TABLE: &str = r#"{"id": "tax","format": "Biological Observation Matrix 1.0.0","type": "OTU table","matrix_type": "dense","matrix_element_type": "float","shape": [5, 2],
"data": [[5.0, 0.0],[3.0, 2.0],[0.0, 40.0],[1.0, 1.0],[2.0, 0.0]],
"rows": [
  {"id": "otu1", "metadata": {"taxonomy": ["k__Bacteria", "p__Firmicutes", "c__Bacilli", "o__Lactobacillales"]}},
  {"id": "otu2", "metadata": {"taxonomy": "k__Bacteria; p__Firmicutes; c__Bacilli; o__Bacillales"}},
  {"id": "otu3", "metadata": {"taxonomy": ["k__Bacteria", "p__Proteobacteria"]}},
  {"id": "otu4", "metadata": null},
  {"id": "otu5", "metadata": {"taxonomy": ["k__Bacteria", "p__Firmicutes", "c__Clostridia"]}}
],
"columns": [{"id": "m1", "metadata": null},{"id": "m2", "metadata": null}]}"#;

/// Scores for two methods on three mock samples.
/// Columns: Dataset, Method, Parameters, SampleID, Precision, Recall,
/// F-measure, Pearson r, Spearman r.
pub const MOCK_SCORES: &str = "\
F2,rdp,0,m3,1,1,1,-0.304176543,0.15430335
F2,rdp,0.1,m3,1,1,1,-0.304176543,0.15430335
F2,rdp,0.1,m2,1,1,1,-0.304176543,0.15430335
F2,rdp,0.2,m3,0.875,1,0.933333333,-0.360486997,-0.20025047
F2,rdp,0.3,m3,0.875,1,0.933333333,-0.360486997,-0.20025047
F2,rdp,0.4,m3,0.875,1,0.933333333,-0.360486997,-0.20025047
F2,rdp,0.5,m3,0.875,1,0.933333333,-0.360486997,-0.20025047
F2,uclust,0.51:0.9:3,m3,0.875,1,0.933333333,0.016870865,0.350438322
F2,uclust,0.51:0.8:3,m3,0.777777778,1,0.875,-0.111550294,0.147297986
F2,uclust,0.51:0.8:3,m2,0.777777778,1,0.875,-0.111550294,0.147297986
B1,rdp,0.2,m1,0.523809524,0.916666667,0.666666667,0.535556024,0.57579308
B1,rdp,0,m1,0.5,0.916666667,0.647058824,0.54720917,0.590459586
B1,rdp,0.3,m1,0.5,0.916666667,0.647058824,0.541731947,0.580986972
B1,rdp,0.1,m1,0.47826087,0.916666667,0.628571429,0.55772667,0.601902881
B1,rdp,0.4,m1,0.47826087,0.916666667,0.628571429,0.549139489,0.562678799
B1,uclust,0.51:0.8:3,m1,0.47826087,0.916666667,0.628571429,0.524553724,0.590696001
B1,rdp,0.5,m1,0.458333333,0.916666667,0.611111111,0.53624197,0.571587285
B1,uclust,0.51:0.9:3,m1,0.44,0.916666667,0.594594595,0.519167888,0.608520351
";

/// [`MOCK_SCORES`] as result rows at level 6.
pub fn mock_score_rows() -> Vec<crate::types::MockResultRow> {
    MOCK_SCORES
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            let f: Vec<&str> = l.split(',').collect();
            let num = |i: usize| f[i].parse::<f64>().unwrap();
            crate::types::MockResultRow {
                dataset: f[0].to_string(),
                level: 6,
                sample_id: f[3].to_string(),
                reference: "ref".to_string(),
                method: f[1].to_string(),
                parameters: f[2].to_string(),
                precision: num(4),
                recall: num(5),
                f_measure: num(6),
                pearson_r: Some(num(7)),
                pearson_p: None,
                spearman_r: Some(num(8)),
                spearman_p: None,
                decoded_params: Default::default(),
            }
        })
        .collect()
}
