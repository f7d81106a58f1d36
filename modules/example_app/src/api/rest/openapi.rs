//! OpenAPI document assembled from the operations registered in `routes`.

use std::collections::BTreeMap;

use axum::handler::Handler;
use axum::http::Method;
use axum::routing::{on, MethodFilter};
use axum::Router;
use utoipa::openapi::{
    content::ContentBuilder,
    info::InfoBuilder,
    path::{
        HttpMethod, OperationBuilder as UOperationBuilder, ParameterBuilder, ParameterIn,
        PathItemBuilder, PathsBuilder,
    },
    request_body::RequestBodyBuilder,
    response::{ResponseBuilder, ResponsesBuilder},
    schema::{ComponentsBuilder, ObjectBuilder, Schema, SchemaType, Type},
    OpenApi, OpenApiBuilder, Ref, RefOr, Required,
};
use utoipa::{PartialSchema, ToSchema};

use crate::api::rest::dto::PageContextDto;
use crate::api::rest::error::{Problem, APPLICATION_PROBLEM_JSON};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone)]
enum ResponseBody {
    /// `{ context, data }` envelope around the named schema.
    Page(String),
    Problem,
    Redirect,
    Text,
}

#[derive(Debug, Clone)]
struct ResponseSpec {
    status: u16,
    description: String,
    body: ResponseBody,
}

#[derive(Clone)]
struct ParamSpec {
    name: String,
    location: ParameterIn,
    required: bool,
    description: String,
}

/// Documentation of one registered operation.
#[derive(Clone)]
pub struct OperationSpec {
    method: Method,
    path: String,
    operation_id: String,
    summary: Option<String>,
    tag: Option<String>,
    params: Vec<ParamSpec>,
    form_schema: Option<String>,
    responses: Vec<ResponseSpec>,
}

/// Collects operations and component schemas while routes are registered.
#[derive(Default)]
pub struct ApiDocs {
    operations: Vec<OperationSpec>,
    components: BTreeMap<String, RefOr<Schema>>,
}

impl ApiDocs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under its schema name and return that name.
    pub fn ensure_schema<T: ToSchema>(&mut self) -> String {
        let name = T::name().to_string();
        if !self.components.contains_key(&name) {
            let mut schemas = Vec::new();
            T::schemas(&mut schemas);
            for (dep_name, dep_schema) in schemas {
                self.components.entry(dep_name).or_insert(dep_schema);
            }
            self.components
                .insert(name.clone(), <T as PartialSchema>::schema());
        }
        name
    }

    pub fn build(&self) -> OpenApi {
        let mut paths = PathsBuilder::new();

        for spec in &self.operations {
            let mut op = UOperationBuilder::new()
                .operation_id(Some(spec.operation_id.clone()))
                .summary(spec.summary.clone());
            if let Some(tag) = &spec.tag {
                op = op.tag(tag.clone());
            }

            for p in &spec.params {
                let schema = Schema::Object(
                    ObjectBuilder::new()
                        .schema_type(SchemaType::Type(Type::String))
                        .build(),
                );
                let required = if p.required {
                    Required::True
                } else {
                    Required::False
                };
                op = op.parameter(
                    ParameterBuilder::new()
                        .name(&p.name)
                        .parameter_in(p.location.clone())
                        .required(required)
                        .description(Some(p.description.clone()))
                        .schema(Some(schema))
                        .build(),
                );
            }

            if let Some(name) = &spec.form_schema {
                let content = ContentBuilder::new()
                    .schema(Some(RefOr::Ref(Ref::from_schema_name(name.clone()))))
                    .build();
                op = op.request_body(Some(
                    RequestBodyBuilder::new()
                        .content(FORM_URLENCODED, content)
                        .required(Some(Required::True))
                        .build(),
                ));
            }

            let mut responses = ResponsesBuilder::new();
            for r in &spec.responses {
                let resp = match &r.body {
                    ResponseBody::Page(name) => ResponseBuilder::new()
                        .description(&r.description)
                        .content(
                            "application/json",
                            ContentBuilder::new()
                                .schema(Some(page_envelope(name)))
                                .build(),
                        )
                        .build(),
                    ResponseBody::Problem => ResponseBuilder::new()
                        .description(&r.description)
                        .content(
                            APPLICATION_PROBLEM_JSON,
                            ContentBuilder::new()
                                .schema(Some(RefOr::Ref(Ref::from_schema_name(Problem::name()))))
                                .build(),
                        )
                        .build(),
                    ResponseBody::Redirect => ResponseBuilder::new()
                        .description(&r.description)
                        .build(),
                    ResponseBody::Text => ResponseBuilder::new()
                        .description(&r.description)
                        .content(
                            "text/plain",
                            ContentBuilder::new()
                                .schema(Some(Schema::Object(
                                    ObjectBuilder::new()
                                        .schema_type(SchemaType::Type(Type::String))
                                        .build(),
                                )))
                                .build(),
                        )
                        .build(),
                };
                responses = responses.response(r.status.to_string(), resp);
            }
            op = op.responses(responses.build());

            let method = match spec.method {
                Method::POST => HttpMethod::Post,
                Method::PUT => HttpMethod::Put,
                Method::DELETE => HttpMethod::Delete,
                Method::PATCH => HttpMethod::Patch,
                _ => HttpMethod::Get,
            };
            let item = PathItemBuilder::new().operation(method, op.build()).build();
            paths = paths.path(spec.path.clone(), item);
        }

        let mut components = ComponentsBuilder::new();
        for (name, schema) in &self.components {
            components = components.schema(name.clone(), schema.clone());
        }

        let info = InfoBuilder::new()
            .title("The Example App")
            .version(env!("CARGO_PKG_VERSION"))
            .description(Some(
                "Course and lesson pages served from a headless CMS, answered as JSON",
            ))
            .build();

        OpenApiBuilder::new()
            .info(info)
            .paths(paths.build())
            .components(Some(components.build()))
            .build()
    }
}

fn page_envelope(data_schema: &str) -> RefOr<Schema> {
    RefOr::T(Schema::Object(
        ObjectBuilder::new()
            .property(
                "context",
                RefOr::Ref(Ref::from_schema_name(PageContextDto::name())),
            )
            .required("context")
            .property("data", RefOr::Ref(Ref::from_schema_name(data_schema)))
            .required("data")
            .build(),
    ))
}

/// Fluent description of one route; `register` adds both the axum route and
/// its documentation.
pub struct Operation {
    spec: OperationSpec,
}

impl Operation {
    fn new(method: Method, path: &str) -> Self {
        let operation_id = format!(
            "example_app.{}{}",
            method.as_str().to_ascii_lowercase(),
            path.replace(['/', '{', '}'], "_")
        );
        Self {
            spec: OperationSpec {
                method,
                path: path.to_string(),
                operation_id,
                summary: None,
                tag: None,
                params: Vec::new(),
                form_schema: None,
                responses: Vec::new(),
            },
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn operation_id(mut self, id: &str) -> Self {
        self.spec.operation_id = id.to_string();
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.spec.summary = Some(summary.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.spec.tag = Some(tag.to_string());
        self
    }

    pub fn path_param(mut self, name: &str, description: &str) -> Self {
        self.spec.params.push(ParamSpec {
            name: name.to_string(),
            location: ParameterIn::Path,
            required: true,
            description: description.to_string(),
        });
        self
    }

    pub fn query_param(mut self, name: &str, description: &str) -> Self {
        self.spec.params.push(ParamSpec {
            name: name.to_string(),
            location: ParameterIn::Query,
            required: false,
            description: description.to_string(),
        });
        self
    }

    /// Query parameters the request pipeline understands on every page.
    pub fn pipeline_params(self) -> Self {
        self.query_param("locale", "Locale code to switch to")
            .query_param("space_id", "Space id for a credential deep link")
            .query_param("delivery_token", "Delivery API token for a credential deep link")
            .query_param("preview_token", "Preview API token for a credential deep link")
            .query_param("api", "`cpa` selects the preview API, anything else delivery")
            .query_param("editorial_features", "`enabled` turns editorial features on")
    }

    pub fn form_request<T: ToSchema>(mut self, docs: &mut ApiDocs) -> Self {
        self.spec.form_schema = Some(docs.ensure_schema::<T>());
        self
    }

    pub fn page_response<T: ToSchema>(mut self, docs: &mut ApiDocs, description: &str) -> Self {
        docs.ensure_schema::<PageContextDto>();
        let name = docs.ensure_schema::<T>();
        self.spec.responses.push(ResponseSpec {
            status: 200,
            description: description.to_string(),
            body: ResponseBody::Page(name),
        });
        self
    }

    pub fn text_response(mut self, description: &str) -> Self {
        self.spec.responses.push(ResponseSpec {
            status: 200,
            description: description.to_string(),
            body: ResponseBody::Text,
        });
        self
    }

    pub fn redirect_response(mut self, description: &str) -> Self {
        self.spec.responses.push(ResponseSpec {
            status: 302,
            description: description.to_string(),
            body: ResponseBody::Redirect,
        });
        self
    }

    pub fn problem_response(mut self, docs: &mut ApiDocs, status: u16, description: &str) -> Self {
        docs.ensure_schema::<Problem>();
        self.spec.responses.push(ResponseSpec {
            status,
            description: description.to_string(),
            body: ResponseBody::Problem,
        });
        self
    }

    pub fn register<H, T>(self, router: Router, docs: &mut ApiDocs, handler: H) -> Router
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let filter = if self.spec.method == Method::POST {
            MethodFilter::POST
        } else {
            MethodFilter::GET
        };
        let axum_path = self.spec.path.clone();
        docs.operations.push(self.spec);
        router.route(&axum_path, on(filter, handler))
    }
}
