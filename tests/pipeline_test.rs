use std::time::Duration;

use nu_plugin_sectors::algo::payload::{make_options_from_table, make_property_updates, PropertyDefinition};
use nu_plugin_sectors::algo::subcategory::default_rules;
use nu_plugin_sectors::algo::table::Table;
use nu_plugin_sectors::algo::taxonomy::{default_taxonomy, TaxonomyKind};
use nu_plugin_sectors::crm::rate_limit::RateLimiter;
use nu_plugin_sectors::crm::{CrmWriter, JsonLinesWriter, ObjectKind};
use nu_plugin_sectors::pipeline::{
    attach_ids, classified_only, classify_table, entities_to_table, rollup_table, ClassifyConfig,
    RollupConfig,
};
use serde_json::Value;

const STARTUPS: &str = "\
id,href,name,industries
1,/s/a,Ledgerly,\"SaaS, FinTech\"
2,/s/b,Stackr,SaaS
3,/s/c,Carely,Health Care
4,/s/d,Weaver,Basket Weaving
";

const LINKS: &str = "\
id,startup_href
vc1,/s/a
vc1,/s/b
vc1,/s/c
vc2,/s/d
vc3,/s/b
vc3,/s/missing
";

fn csv(text: &str) -> Table {
    Table::from_csv_reader(text.as_bytes()).unwrap()
}

fn lines(bytes: Vec<u8>) -> Vec<Value> {
    String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn rollup_ranks_portfolio_categories() {
    let out = rollup_table(
        &csv(STARTUPS),
        &csv(LINKS),
        &ClassifyConfig::for_kind(TaxonomyKind::Industries),
        &RollupConfig::for_kind(TaxonomyKind::Industries),
        &default_taxonomy(TaxonomyKind::Industries),
        &default_rules(),
    )
    .unwrap();

    assert_eq!(
        out.headers(),
        &["id", "pf_inds", "top5_inds", "top1_inds"].map(String::from)
    );
    // vc2 only links to an unclassified startup
    assert_eq!(out.len(), 2);
    assert_eq!(out.cell(0, 0), Some("vc1"));
    assert_eq!(out.cell(0, 1), Some(";SaaS;FinTech;Health"));
    assert_eq!(out.cell(0, 2), Some(";SaaS;FinTech;Health"));
    assert_eq!(out.cell(0, 3), Some("SaaS"));
    assert_eq!(out.cell(1, 0), Some("vc3"));
    assert_eq!(out.cell(1, 3), Some("SaaS"));
}

#[test]
fn classify_then_push_in_batches() {
    let mut text = String::from("id,industries\n");
    for i in 0..23 {
        text.push_str(&format!("{i},SaaS\n"));
    }
    text.push_str("99,Basket Weaving\n");

    let config = ClassifyConfig::default();
    let entities = classified_only(
        classify_table(
            &csv(&text),
            &config,
            &default_taxonomy(TaxonomyKind::Industries),
            &default_rules(),
        )
        .unwrap(),
    );
    let table = entities_to_table(&entities, &config);
    let updates = make_property_updates(&table, "id", "pf_inds").unwrap();
    assert_eq!(updates.len(), 23);

    let mut writer = JsonLinesWriter::new(Vec::new());
    let definition = PropertyDefinition::checkbox(
        "pf_inds",
        "Portfolio Industries",
        "companyinformation",
        make_options_from_table(&table, "pf_inds").unwrap(),
    );
    writer
        .register_property_options(ObjectKind::Company, &definition)
        .unwrap();

    let limiter = RateLimiter::new(10, Duration::from_secs(10)).unwrap();
    let mut slept = Vec::new();
    let report = limiter
        .dispatch_with(&mut writer, ObjectKind::Company, &updates, |d| slept.push(d))
        .unwrap();
    assert_eq!(report.batches, 3);
    assert_eq!(report.items, 23);
    assert_eq!(slept, vec![Duration::from_secs(10); 2]);

    let calls = lines(writer.into_inner());
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0]["call"], "register_property");
    assert_eq!(calls[0]["property"]["options"][0]["value"], "saas");
    let sizes: Vec<usize> = calls[1..]
        .iter()
        .map(|c| c["inputs"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![10, 10, 3]);
    assert_eq!(calls[1]["inputs"][0]["properties"]["pf_inds"], ";saas");
}

#[test]
fn angel_ids_come_from_export() {
    let angels = csv("\
Investor Name,Description,industries
Ann Lee,angel investor,FinTech
Bo Ray,operator,Health Care
Cy Fox,scout,SaaS
");
    let export = csv("\
id,name,About
501,Ann Lee,angel investor
502,Bo Ray,operator
");
    let config = ClassifyConfig {
        id_column: "Investor Name".into(),
        output_column: "tx_angel_inds".into(),
        carry_columns: vec!["Description".into()],
        ..ClassifyConfig::default()
    };
    let entities = classify_table(
        &angels,
        &config,
        &default_taxonomy(TaxonomyKind::Industries),
        &default_rules(),
    )
    .unwrap();
    let table = entities_to_table(&entities, &config);
    let joined = attach_ids(
        &table,
        &export,
        &["Investor Name", "Description"],
        &["name", "About"],
        "id",
    )
    .unwrap();
    assert_eq!(joined.table.len(), 2);

    let updates = make_property_updates(&joined.table, &joined.id_column, "tx_angel_inds").unwrap();
    let ids: Vec<&str> = updates.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["501", "502"]);
    assert_eq!(updates[1].properties["tx_angel_inds"], ";health");
}
