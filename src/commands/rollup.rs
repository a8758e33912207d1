use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{input_rows, labeled, output_rows};
use crate::algo::subcategory::{resolve_rules, SubcategoryRules};
use crate::algo::table::Table;
use crate::algo::taxonomy::{resolve_taxonomy, TaxonomyKind};
use crate::ops;
use crate::pipeline::{ClassifyConfig, RollupConfig};
use crate::SectorsPlugin;

pub struct Rollup;

impl PluginCommand for Rollup {
    type Plugin = SectorsPlugin;

    fn name(&self) -> &str {
        "sectors rollup"
    }

    fn description(&self) -> &str {
        "Classify portfolio companies and roll their categories up to investors with top-5 and top-1 columns"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::table())
            .required_named(
                "links",
                SyntaxShape::Filepath,
                "CSV linking investor ids to company keys",
                Some('l'),
            )
            .named(
                "kind",
                SyntaxShape::String,
                "Taxonomy: industries or tags (default: industries)",
                Some('k'),
            )
            .named(
                "field",
                SyntaxShape::String,
                "Field to classify (default: same as --kind)",
                Some('f'),
            )
            .named(
                "description",
                SyntaxShape::String,
                "Column checked by description rules (default: description, when present)",
                None,
            )
            .named(
                "entity-key",
                SyntaxShape::String,
                "Company column the links refer to (default: href)",
                None,
            )
            .named(
                "link-id",
                SyntaxShape::String,
                "Investor id column in the links (default: id)",
                None,
            )
            .named(
                "link-key",
                SyntaxShape::String,
                "Company key column in the links (default: startup_href)",
                None,
            )
            .named(
                "taxonomy",
                SyntaxShape::String,
                "Path to taxonomy JSON",
                Some('t'),
            )
            .named(
                "rules",
                SyntaxShape::String,
                "Path to subcategory rules JSON",
                Some('r'),
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["rollup", "portfolio", "investor", "industry", "rank"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![Example {
            example: r#"open startups.csv | sectors rollup --links investments.csv"#,
            description: "Portfolio industries per investor",
            result: None,
        }]
    }

    fn run(
        &self,
        _plugin: &SectorsPlugin,
        _engine: &EngineInterface,
        call: &EvaluatedCall,
        input: PipelineData,
    ) -> Result<PipelineData, LabeledError> {
        let links_path: String = call
            .get_flag::<String>("links")?
            .ok_or_else(|| LabeledError::new("--links is required"))?;
        let kind_str: String = call
            .get_flag::<String>("kind")?
            .unwrap_or_else(|| "industries".into());
        let kind = TaxonomyKind::from_str(&kind_str).ok_or_else(|| {
            LabeledError::new(format!("Unknown kind '{kind_str}'. Use: industries, tags"))
        })?;
        let taxonomy_path: Option<String> = call.get_flag("taxonomy")?;
        let rules_path: Option<String> = call.get_flag("rules")?;
        let head = call.head;

        let mut classify = ClassifyConfig::for_kind(kind);
        classify.field = call
            .get_flag::<String>("field")?
            .unwrap_or_else(|| kind.name().into());
        classify.description_column = call.get_flag("description")?;

        let mut config = RollupConfig::for_kind(kind);
        if let Some(key) = call.get_flag::<String>("entity-key")? {
            config.entity_key = key;
        }
        if let Some(id) = call.get_flag::<String>("link-id")? {
            config.link_id_column = id;
        }
        if let Some(key) = call.get_flag::<String>("link-key")? {
            config.link_key_column = key;
        }

        let rows = input_rows(input);
        if rows.is_empty() {
            return Ok(output_rows(serde_json::Value::Null, head));
        }

        let table = Table::from_json_rows(&rows);
        let links = Table::from_csv_path(&links_path).map_err(labeled)?;
        let taxonomy = resolve_taxonomy(kind, taxonomy_path.as_deref()).map_err(labeled)?;
        let rules = if classify.resolve_subcategories {
            resolve_rules(rules_path.as_deref()).map_err(labeled)?
        } else {
            SubcategoryRules::default()
        };
        let out = ops::op_rollup(&table, &links, &classify, &config, &taxonomy, &rules)
            .map_err(labeled)?;
        Ok(output_rows(out, head))
    }
}
