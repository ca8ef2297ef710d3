//! Per-model file rendering.
//!
//! Templates are compiled into the binary and rendered with minijinja. Case
//! conversions are exposed as filters from the [`Helpers`] table the renderer
//! is built with. Rendered files are fully overwritten on every run.

use std::collections::BTreeSet;
use std::path::PathBuf;
use minijinja::{context, AutoEscape, Environment, UndefinedBehavior, Value};

use super::case::{kebab_case, pascal_case, snake_case, Helpers};
use super::paths::import_path;
use super::routes::{base_path, create_validator_name, default_fields, plural_name, update_validator_name};
use crate::config::ProjectLayout;
use crate::diagnostic::GeneratorError;
use crate::schema::{ModelSchema, ModuleSchema};

/// Default page size of `createFindParams()`.
const PAGE_SIZE: u32 = 50;

/// What a template is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateScope {
    /// Once per project, only when the file does not exist yet.
    Project,
    /// Once per module.
    Module,
    /// Once per model.
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    ModuleService,
    ModuleIndex,
    Model,
    Validators,
    RouteCollection,
    RouteItem,
    AdminListPage,
    AdminCreate,
    AdminEdit,
    UnlessPath,
    AdminSdk,
}

impl TemplateId {
    pub const ALL: [TemplateId; 11] = [
        TemplateId::ModuleService,
        TemplateId::ModuleIndex,
        TemplateId::Model,
        TemplateId::Validators,
        TemplateId::RouteCollection,
        TemplateId::RouteItem,
        TemplateId::AdminListPage,
        TemplateId::AdminCreate,
        TemplateId::AdminEdit,
        TemplateId::UnlessPath,
        TemplateId::AdminSdk,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ModuleService => "module_service",
            Self::ModuleIndex => "module_index",
            Self::Model => "model",
            Self::Validators => "validators",
            Self::RouteCollection => "route_collection",
            Self::RouteItem => "route_item",
            Self::AdminListPage => "admin_list_page",
            Self::AdminCreate => "admin_create",
            Self::AdminEdit => "admin_edit",
            Self::UnlessPath => "unless_path",
            Self::AdminSdk => "admin_sdk",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Self::ModuleService => include_str!("../../templates/module_service.ts.j2"),
            Self::ModuleIndex => include_str!("../../templates/module_index.ts.j2"),
            Self::Model => include_str!("../../templates/model.ts.j2"),
            Self::Validators => include_str!("../../templates/validators.ts.j2"),
            Self::RouteCollection => include_str!("../../templates/route_collection.ts.j2"),
            Self::RouteItem => include_str!("../../templates/route_item.ts.j2"),
            Self::AdminListPage => include_str!("../../templates/admin_list_page.tsx.j2"),
            Self::AdminCreate => include_str!("../../templates/admin_create.tsx.j2"),
            Self::AdminEdit => include_str!("../../templates/admin_edit.tsx.j2"),
            Self::UnlessPath => include_str!("../../templates/unless_path.ts.j2"),
            Self::AdminSdk => include_str!("../../templates/admin_sdk.ts.j2"),
        }
    }

    pub fn scope(&self) -> TemplateScope {
        match self {
            Self::UnlessPath | Self::AdminSdk => TemplateScope::Project,
            Self::ModuleService | Self::ModuleIndex => TemplateScope::Module,
            _ => TemplateScope::Model,
        }
    }

    /// Output file, relative to the project root. Model templates need a
    /// model.
    pub fn output_path(
        &self,
        layout: &ProjectLayout,
        module: &ModuleSchema,
        model: Option<&ModelSchema>,
    ) -> Option<PathBuf> {
        let module_dir = layout.module_dir(&module.module_name);
        let path = match (self, model) {
            (Self::UnlessPath, _) => layout.api_dir().join("utils/unless-path.ts"),
            (Self::AdminSdk, _) => admin_sdk_path(layout),
            (Self::ModuleService, _) => module_dir.join("service.ts"),
            (Self::ModuleIndex, _) => module_dir.join("index.ts"),
            (Self::Model, Some(model)) => module_dir.join("models").join(format!("{}.ts", snake_case(&model.name))),
            (Self::Validators, Some(model)) => layout.route_dir(&base_path(module, model)).join("validators.ts"),
            (Self::RouteCollection, Some(model)) => layout.route_dir(&base_path(module, model)).join("route.ts"),
            (Self::RouteItem, Some(model)) => layout.route_dir(&base_path(module, model)).join("[id]/route.ts"),
            (Self::AdminListPage, Some(model)) => {
                let base = base_path(module, model);
                let relative = base.trim_start_matches("/admin/");
                layout.admin_dir().join("routes").join(relative).join("page.tsx")
            }
            (Self::AdminCreate, Some(model)) => {
                let kebab = kebab_case(&model.name);
                layout.admin_dir().join("components").join(&kebab).join(format!("create-{}-form.tsx", kebab))
            }
            (Self::AdminEdit, Some(model)) => {
                let kebab = kebab_case(&model.name);
                layout.admin_dir().join("components").join(&kebab).join(format!("edit-{}-form.tsx", kebab))
            }
            (_, None) => return None,
        };
        Some(path)
    }
}

fn admin_sdk_path(layout: &ProjectLayout) -> PathBuf {
    layout.admin_dir().join("lib/sdk.ts")
}

/// Renders module and model files.
pub struct TemplateRenderer {
    env: Environment<'static>,
    layout: ProjectLayout,
}

impl TemplateRenderer {
    /// Builds a renderer whose templates can use exactly the given helpers.
    pub fn new(helpers: &Helpers, layout: ProjectLayout) -> Result<Self, GeneratorError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        for (name, helper) in helpers.iter() {
            env.add_filter(name, move |value: String| helper(&value));
        }

        for id in TemplateId::ALL {
            env.add_template(id.name(), id.source())
                .map_err(|e| GeneratorError::TemplateFailed {
                    template: id.name().to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(Self { env, layout })
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Renders one template. Model-scoped templates fail without a model.
    pub fn render(
        &self,
        id: TemplateId,
        model: Option<&ModelSchema>,
        module: &ModuleSchema,
    ) -> Result<String, GeneratorError> {
        let failed = |message: String| GeneratorError::TemplateFailed {
            template: id.name().to_string(),
            message,
        };

        let ctx = match (id.scope(), model) {
            (TemplateScope::Model, Some(model)) => self.model_context(id, module, model),
            (TemplateScope::Model, None) => {
                return Err(failed(format!("template needs a model of module '{}'", module.module_name)));
            }
            _ => module_context(module),
        };

        let template = self.env.get_template(id.name()).map_err(|e| failed(e.to_string()))?;
        template.render(ctx).map_err(|e| failed(e.to_string()))
    }

    /// Renders every module and model file of `module`, in schema order.
    pub fn render_module(&self, module: &ModuleSchema) -> Result<Vec<(PathBuf, String)>, GeneratorError> {
        let mut files = Vec::new();

        for id in TemplateId::ALL.iter().filter(|id| id.scope() == TemplateScope::Module) {
            if let Some(path) = id.output_path(&self.layout, module, None) {
                files.push((path, self.render(*id, None, module)?));
            }
        }

        for model in &module.models {
            for id in TemplateId::ALL.iter().filter(|id| id.scope() == TemplateScope::Model) {
                if let Some(path) = id.output_path(&self.layout, module, Some(model)) {
                    files.push((path, self.render(*id, Some(model), module)?));
                }
            }
        }

        Ok(files)
    }

    /// Renders the shared support files. Callers only write those that do
    /// not exist yet.
    pub fn render_project_files(&self, module: &ModuleSchema) -> Result<Vec<(PathBuf, String)>, GeneratorError> {
        let mut files = Vec::new();
        for id in TemplateId::ALL.iter().filter(|id| id.scope() == TemplateScope::Project) {
            if let Some(path) = id.output_path(&self.layout, module, None) {
                files.push((path, self.render(*id, None, module)?));
            }
        }
        Ok(files)
    }

    fn model_context(&self, id: TemplateId, module: &ModuleSchema, model: &ModelSchema) -> Value {
        let base = base_path(module, model);
        let route_dir = self.layout.route_dir(&base);
        let module_dir = self.layout.module_dir(&module.module_name);
        let output_dir = id
            .output_path(&self.layout, module, Some(model))
            .and_then(|p| p.parent().map(|d| d.to_path_buf()))
            .unwrap_or_else(|| route_dir.clone());
        let sdk = admin_sdk_path(&self.layout).with_extension("");

        let related_models: BTreeSet<&str> = model
            .fields
            .iter()
            .filter_map(|f| f.relation.as_ref())
            .map(|r| r.model.as_str())
            .filter(|name| *name != model.name)
            .collect();
        let columns: Vec<String> = default_fields(model).into_iter().filter(|c| c != "id").collect();
        let form_fields: Vec<_> = model.fields.iter().filter(|f| f.relation.is_none()).collect();

        context! {
            module => module,
            model => model,
            service => service_name(module),
            module_const => module_const(module),
            plural_name => plural_name(model),
            base_path => base,
            create_validator => create_validator_name(model),
            update_validator => update_validator_name(model),
            module_import => import_path(&output_dir, &module_dir),
            sdk_import => import_path(&output_dir, &sdk),
            related_models => related_models,
            columns => columns,
            form_fields => form_fields,
            page_size => PAGE_SIZE,
        }
    }
}

fn module_context(module: &ModuleSchema) -> Value {
    context! {
        module => module,
        service => service_name(module),
        module_const => module_const(module),
    }
}

fn service_name(module: &ModuleSchema) -> String {
    format!("{}ModuleService", pascal_case(&module.module_name))
}

fn module_const(module: &ModuleSchema) -> String {
    format!("{}_MODULE", snake_case(&module.module_name).to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn wipers() -> ModuleSchema {
        serde_json::from_str(
            r#"{
                "moduleName": "wipers",
                "plural": "wipers",
                "models": [
                    { "name": "Wiper", "singular": "wiper", "plural": "wipers", "isParent": true,
                      "fields": [
                        { "name": "name", "type": "text", "validation": "min(1)" },
                        { "name": "released_at", "type": "date", "chainables": ["nullable()"] },
                        { "name": "kits", "type": "text",
                          "relation": { "type": "hasMany", "model": "WiperKit", "mappedBy": "wiper" } }
                      ] },
                    { "name": "WiperKit", "singular": "kit", "plural": "kits",
                      "parent": { "model": "Wiper", "routePrefix": "wipers" },
                      "fields": [
                        { "name": "quantity", "type": "number" },
                        { "name": "wiper", "type": "text",
                          "relation": { "type": "belongsTo", "model": "Wiper" } }
                      ] }
                ]
            }"#,
        )
        .unwrap()
    }

    fn renderer() -> TemplateRenderer {
        TemplateRenderer::new(&Helpers::standard(), ProjectLayout::default()).unwrap()
    }

    #[test]
    fn test_every_template_renders() {
        let module = wipers();
        let renderer = renderer();
        for id in TemplateId::ALL {
            let model = match id.scope() {
                TemplateScope::Model => Some(&module.models[1]),
                _ => None,
            };
            let output = renderer.render(id, model, &module);
            assert!(output.is_ok(), "{}: {:?}", id.name(), output.err());
        }
    }

    #[test]
    fn test_model_template() {
        let module = wipers();
        let renderer = renderer();

        let wiper = renderer.render(TemplateId::Model, Some(&module.models[0]), &module).unwrap();
        assert!(wiper.contains("const Wiper = model.define(\"wiper\", {"));
        assert!(wiper.contains("  name: model.text(),\n"));
        assert!(wiper.contains("  released_at: model.dateTime().nullable(),\n"));
        assert!(wiper.contains("kits: model.hasMany(() => WiperKit, { mappedBy: \"wiper\","));
        assert!(wiper.contains("import WiperKit from \"./wiper_kit\""));

        let kit = renderer.render(TemplateId::Model, Some(&module.models[1]), &module).unwrap();
        assert!(kit.contains("  wiper: model.belongsTo(() => Wiper),\n"));
    }

    #[test]
    fn test_validators_template() {
        let module = wipers();
        let output = renderer()
            .render(TemplateId::Validators, Some(&module.models[0]), &module)
            .unwrap();
        assert!(output.contains("export const PostAdminCreateWiper = z.object({"));
        assert!(output.contains("  name: z.string().min(1),\n"));
        assert!(output.contains("  released_at: z.coerce.date().nullable(),\n"));
        assert!(!output.contains("kits:"));
        assert!(output.contains("export const PostAdminUpdateWiper = PostAdminCreateWiper.partial()"));

        let kit = renderer()
            .render(TemplateId::Validators, Some(&module.models[1]), &module)
            .unwrap();
        assert!(kit.contains("  wiper_id: z.string(),\n"));
    }

    #[test]
    fn test_route_templates_import_module() {
        let module = wipers();
        let renderer = renderer();
        let kit = &module.models[1];

        let collection = renderer.render(TemplateId::RouteCollection, Some(kit), &module).unwrap();
        assert!(collection.contains("import { WIPERS_MODULE } from \"../../../../modules/wipers\""));
        assert!(collection.contains("service.listAndCountWiperKits("));

        let item = renderer.render(TemplateId::RouteItem, Some(kit), &module).unwrap();
        assert!(item.contains("from \"../../../../../modules/wipers\""));
        assert!(item.contains("service.retrieveWiperKit(req.params.id"));
    }

    #[test]
    fn test_module_templates() {
        let module = wipers();
        let service = renderer().render(TemplateId::ModuleService, None, &module).unwrap();
        assert!(service.contains("import WiperKit from \"./models/wiper_kit\"\n"));
        assert!(service.contains("class WipersModuleService extends MedusaService({\n  Wiper,\n  WiperKit,\n}) {}"));

        let index = renderer().render(TemplateId::ModuleIndex, None, &module).unwrap();
        assert!(index.contains("export const WIPERS_MODULE = \"wipers\""));
    }

    #[test]
    fn test_model_template_requires_model() {
        let module = wipers();
        let err = renderer().render(TemplateId::Model, None, &module).unwrap_err();
        assert!(matches!(err, GeneratorError::TemplateFailed { ref template, .. } if template == "model"));
    }

    #[test]
    fn test_helpers_are_explicit() {
        let module = wipers();
        let bare = TemplateRenderer::new(&Helpers::new(), ProjectLayout::default()).unwrap();
        assert!(bare.render(TemplateId::ModuleService, None, &module).is_err());
    }

    #[test]
    fn test_output_paths() {
        let module = wipers();
        let layout = ProjectLayout::default();
        let kit = &module.models[1];
        assert_eq!(
            TemplateId::RouteItem.output_path(&layout, &module, Some(kit)).unwrap(),
            Path::new("src/api/admin/wipers/kits/[id]/route.ts")
        );
        assert_eq!(
            TemplateId::AdminListPage.output_path(&layout, &module, Some(kit)).unwrap(),
            Path::new("src/admin/routes/wipers/kits/page.tsx")
        );
        assert_eq!(
            TemplateId::AdminEdit.output_path(&layout, &module, Some(kit)).unwrap(),
            Path::new("src/admin/components/wiper-kit/edit-wiper-kit-form.tsx")
        );
        assert!(TemplateId::Model.output_path(&layout, &module, None).is_none());
    }

    #[test]
    fn test_render_module_file_count() {
        let module = wipers();
        let files = renderer().render_module(&module).unwrap();
        assert_eq!(files.len(), 2 + 7 * module.models.len());
    }
}
