use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{input_rows, labeled, output_rows};
use crate::algo::subcategory::{resolve_rules, SubcategoryRules};
use crate::algo::taxonomy::{resolve_taxonomy, TaxonomyKind};
use crate::ops;
use crate::pipeline::ClassifyConfig;
use crate::SectorsPlugin;

pub struct Classify;

impl PluginCommand for Classify {
    type Plugin = SectorsPlugin;

    fn name(&self) -> &str {
        "sectors classify"
    }

    fn description(&self) -> &str {
        "Map free-text industries or tags onto a fixed taxonomy, one row per entity"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::table())
            .named(
                "kind",
                SyntaxShape::String,
                "Taxonomy: industries or tags (default: industries)",
                Some('k'),
            )
            .named(
                "field",
                SyntaxShape::String,
                "Field to classify (default: industries)",
                Some('f'),
            )
            .named("id", SyntaxShape::String, "Id column (default: id)", None)
            .named(
                "delimiter",
                SyntaxShape::String,
                "Regex between phrases (default: ,)",
                Some('d'),
            )
            .named(
                "taxonomy",
                SyntaxShape::String,
                "Path to taxonomy JSON (default: env, XDG config, then built-in)",
                Some('t'),
            )
            .named(
                "rules",
                SyntaxShape::String,
                "Path to subcategory rules JSON",
                Some('r'),
            )
            .named(
                "column",
                SyntaxShape::String,
                "Output column (default: pf_inds or pf_tags)",
                Some('c'),
            )
            .named(
                "description",
                SyntaxShape::String,
                "Column checked by the taxonomy's description rules",
                None,
            )
            .named(
                "keep",
                SyntaxShape::List(Box::new(SyntaxShape::String)),
                "Scalar columns carried onto each entity",
                None,
            )
            .switch(
                "no-resolve",
                "Keep subcategories next to their parents",
                None,
            )
            .switch(
                "all",
                "Also emit entities that matched no category",
                Some('a'),
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["classify", "industry", "taxonomy", "tags", "normalize", "category"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![
            Example {
                example: r#"open startups.csv | sectors classify --keep [href name]"#,
                description: "Classify industries with the built-in taxonomy",
                result: None,
            },
            Example {
                example: r#"open startups.csv | sectors classify --kind tags --field tags"#,
                description: "Classify tags into the pf_tags column",
                result: None,
            },
        ]
    }

    fn run(
        &self,
        _plugin: &SectorsPlugin,
        _engine: &EngineInterface,
        call: &EvaluatedCall,
        input: PipelineData,
    ) -> Result<PipelineData, LabeledError> {
        let kind_str: String = call
            .get_flag::<String>("kind")?
            .unwrap_or_else(|| "industries".into());
        let kind = TaxonomyKind::from_str(&kind_str).ok_or_else(|| {
            LabeledError::new(format!("Unknown kind '{kind_str}'. Use: industries, tags"))
        })?;
        let taxonomy_path: Option<String> = call.get_flag("taxonomy")?;
        let rules_path: Option<String> = call.get_flag("rules")?;
        let keep_all = call.has_flag("all")?;
        let head = call.head;

        let mut config = ClassifyConfig::for_kind(kind);
        if let Some(field) = call.get_flag::<String>("field")? {
            config.field = field;
        }
        if let Some(id) = call.get_flag::<String>("id")? {
            config.id_column = id;
        }
        if let Some(delimiter) = call.get_flag::<String>("delimiter")? {
            config.delimiter = delimiter;
        }
        if let Some(column) = call.get_flag::<String>("column")? {
            config.output_column = column;
        }
        config.description_column = call.get_flag("description")?;
        config.carry_columns = call.get_flag::<Vec<String>>("keep")?.unwrap_or_default();
        if call.has_flag("no-resolve")? {
            config.resolve_subcategories = false;
        }

        let rows = input_rows(input);
        if rows.is_empty() {
            return Ok(output_rows(serde_json::Value::Null, head));
        }

        let taxonomy = resolve_taxonomy(kind, taxonomy_path.as_deref()).map_err(labeled)?;
        let rules = if config.resolve_subcategories {
            resolve_rules(rules_path.as_deref()).map_err(labeled)?
        } else {
            SubcategoryRules::default()
        };
        let out = ops::op_classify(&rows, &config, &taxonomy, &rules, keep_all).map_err(labeled)?;
        Ok(output_rows(out, head))
    }
}
