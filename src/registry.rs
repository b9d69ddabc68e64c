//! Turns declarative module configuration into module values.
//!
//! The mapping is a plain `match` over [`ModuleConfig`]: every kind a config
//! file can name is listed there, and container kinds recurse into their
//! nested `modules`.

use crate::config::{ConfigError, ModuleConfig};
use crate::module::Module;
use crate::modules::{
    Branch, BranchConcat, Concat, Documents, FrontMatter, GroupBy, Markdown, Meta, OrderBy,
    Paginate, ReadFiles, Replace, ReplaceIn, Trace, WriteFiles, Yaml,
};
use crate::value::Value;

/// Build one module from its declaration.
pub fn build(config: &ModuleConfig) -> Result<Box<dyn Module>, ConfigError> {
    let module: Box<dyn Module> = match config {
        ModuleConfig::ReadFiles { pattern } => Box::new(ReadFiles::new(pattern)),
        ModuleConfig::WriteFiles { extension } => Box::new(match extension {
            Some(ext) => WriteFiles::with_extension(ext),
            None => WriteFiles::new(),
        }),
        ModuleConfig::FrontMatter {
            delimiter,
            ignore_delimiter_on_first_line,
            modules,
        } => Box::new(
            FrontMatter::with_delimiter(delimiter, build_all(modules)?)
                .ignore_delimiter_on_first_line(*ignore_delimiter_on_first_line),
        ),
        ModuleConfig::Yaml { key } => Box::new(match key {
            Some(key) => Yaml::with_key(key),
            None => Yaml::new(),
        }),
        ModuleConfig::Markdown => Box::new(Markdown::new()),
        ModuleConfig::Replace {
            search,
            replacement,
            regex,
        } => {
            if *regex {
                Box::new(Replace::regex(search, replacement).map_err(|e| {
                    ConfigError::Validation(format!("replace: {e}"))
                })?)
            } else {
                Box::new(Replace::new(search, replacement))
            }
        }
        ModuleConfig::ReplaceIn { search, modules } => {
            Box::new(ReplaceIn::new(search, build_all(modules)?))
        }
        ModuleConfig::Meta { key, value } => Box::new(Meta::new(key, Value::from(value.clone()))),
        ModuleConfig::Concat { modules } => Box::new(Concat::new(build_all(modules)?)),
        ModuleConfig::Branch { modules } => Box::new(Branch::new(build_all(modules)?)),
        ModuleConfig::BranchConcat { when, modules } => {
            let module = BranchConcat::new(build_all(modules)?);
            Box::new(match when {
                Some(key) => module.when_key(key),
                None => module,
            })
        }
        ModuleConfig::GroupBy { key, modules } => {
            Box::new(GroupBy::by_key(key, build_all(modules)?))
        }
        ModuleConfig::OrderBy {
            key,
            descending,
            then_by,
        } => {
            let mut order = OrderBy::by_key(key);
            if *descending {
                order = order.descending();
            }
            for key in then_by {
                order = order.then_by_key(key);
            }
            Box::new(order)
        }
        ModuleConfig::Paginate { size, modules } => {
            Box::new(Paginate::new(*size, build_all(modules)?))
        }
        ModuleConfig::Documents { pipeline } => Box::new(match pipeline {
            Some(name) => Documents::from_pipeline(name),
            None => Documents::all(),
        }),
        ModuleConfig::Trace { message } => Box::new(Trace::new(message)),
    };
    Ok(module)
}

/// Build a list of declarations, in order.
pub fn build_all(configs: &[ModuleConfig]) -> Result<Vec<Box<dyn Module>>, ConfigError> {
    configs.iter().map(build).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::test_helpers::*;

    fn declared(toml_str: &str) -> Vec<ModuleConfig> {
        let config: SiteConfig = toml::from_str(toml_str).unwrap();
        config.pipelines.into_iter().next().unwrap().modules
    }

    #[test]
    fn builds_every_kind_with_its_name() {
        let modules = build_all(&declared(
            r#"
[[pipelines]]
modules = [
  { kind = "read_files", pattern = "*.md" },
  { kind = "front_matter", modules = [{ kind = "yaml" }] },
  { kind = "markdown" },
  { kind = "replace", search = "a", replacement = "b" },
  { kind = "replace_in", search = "{{content}}" },
  { kind = "meta", key = "k", value = 1 },
  { kind = "concat" },
  { kind = "branch" },
  { kind = "branch_concat", when = "draft" },
  { kind = "group_by", key = "tag" },
  { kind = "order_by", key = "date", descending = true, then_by = ["title"] },
  { kind = "paginate", size = 10 },
  { kind = "documents" },
  { kind = "trace", message = "hi" },
  { kind = "write_files", extension = "html" },
]
"#,
        ))
        .unwrap();
        let names: Vec<&str> = modules.iter().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec![
                "ReadFiles",
                "FrontMatter",
                "Markdown",
                "Replace",
                "ReplaceIn",
                "Meta",
                "Concat",
                "Branch",
                "BranchConcat",
                "GroupBy",
                "OrderBy",
                "Paginate",
                "Documents",
                "Trace",
                "WriteFiles",
            ]
        );
    }

    #[test]
    fn bad_regex_is_a_config_error() {
        let result = build(&ModuleConfig::Replace {
            search: "(".into(),
            replacement: String::new(),
            regex: true,
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn built_modules_behave_like_their_declarations() {
        let docs = run_modules(
            build_all(&declared(
                r#"
[[pipelines]]
modules = [
  { kind = "meta", key = "Title", value = "hello world" },
  { kind = "meta", key = "Tags", value = ["a", "b"] },
  { kind = "replace", search = "o", replacement = "0" },
]
"#,
            ))
            .unwrap(),
        );
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].string("Title").as_deref(), Some("hello world"));
        assert_eq!(
            docs[0].get_as::<Vec<String>>("Tags").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn nested_declarations_are_built() {
        let docs = run_modules(
            build_all(&declared(
                r#"
[[pipelines]]
modules = [
  { kind = "concat", modules = [
    { kind = "meta", key = "inner", value = true },
  ] },
]
"#,
            ))
            .unwrap(),
        );
        assert_eq!(docs.len(), 2);
        assert!(docs[0].get("inner").is_none());
        assert!(docs[1].get_as::<bool>("inner").unwrap());
    }
}
