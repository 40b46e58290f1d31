//! Resource argument parsing, following kubectl's `TYPE[,TYPE...] [NAME...]`
//! and `TYPE/NAME...` conventions.

/// One resource type requested on the command line, with optional names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// Resource as typed by the operator (`cm`, `secrets`, `deployment.apps`).
    pub resource: String,
    /// Object names; empty means every object matching the selectors.
    pub names: Vec<String>,
    /// Argument text the request came from.
    pub source: String,
}

/// Namespace scope and selectors shared by the workload and candidate listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListScope {
    /// Namespace to list in; `None` lists across all namespaces.
    pub namespace: Option<String>,
    /// Label selector.
    pub label_selector: Option<String>,
    /// Field selector.
    pub field_selector: Option<String>,
}

/// The full candidate query: requested resources plus scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    /// Requested resources in argument order.
    pub requests: Vec<ResourceRequest>,
    /// Namespace scope and selectors.
    pub scope: ListScope,
}

/// Errors from resource argument parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// No resource arguments were given.
    #[error("you must specify the type of resource to prune, e.g. 'configmap' or 'configmap,secret'")]
    Empty,
    /// `TYPE/NAME` arguments were mixed with bare arguments.
    #[error("there is no need to specify a resource type as a separate argument when passing arguments in resource/name form (e.g. 'kubectl prune secret/foo' instead of 'kubectl prune secret secret/foo')")]
    MixedForms,
    /// An argument had an empty type or name component.
    #[error("arguments in resource/name form must have a single resource and name: {0:?}")]
    Malformed(String),
}

/// Short names kubectl accepts for built-in resources.
const SHORT_NAMES: &[(&str, &str)] = &[
    ("cm", "configmaps"),
    ("cj", "cronjobs"),
    ("crd", "customresourcedefinitions"),
    ("deploy", "deployments"),
    ("ds", "daemonsets"),
    ("ep", "endpoints"),
    ("ev", "events"),
    ("ing", "ingresses"),
    ("no", "nodes"),
    ("ns", "namespaces"),
    ("po", "pods"),
    ("pv", "persistentvolumes"),
    ("pvc", "persistentvolumeclaims"),
    ("rs", "replicasets"),
    ("sa", "serviceaccounts"),
    ("sts", "statefulsets"),
    ("svc", "services"),
];

/// Expand a kubectl short name (`cm`) to its plural resource name.
///
/// Anything that is not a known short name is returned unchanged.
pub fn expand_short_name(resource: &str) -> &str {
    SHORT_NAMES
        .iter()
        .find(|(short, _)| *short == resource)
        .map_or(resource, |&(_, plural)| plural)
}

/// Parse positional resource arguments.
///
/// # Errors
///
/// Returns [`QueryError`] for empty input, mixed argument forms, or
/// malformed `TYPE/NAME` pairs.
pub fn parse_resource_args(args: &[String]) -> Result<Vec<ResourceRequest>, QueryError> {
    let Some((first, rest)) = args.split_first() else {
        return Err(QueryError::Empty);
    };

    let slashed = args.iter().filter(|a| a.contains('/')).count();
    if slashed > 0 {
        if slashed != args.len() {
            return Err(QueryError::MixedForms);
        }
        return args.iter().map(|arg| parse_type_name(arg)).collect();
    }

    let types: Vec<&str> = first.split(',').filter(|t| !t.is_empty()).collect();
    if types.is_empty() {
        return Err(QueryError::Empty);
    }
    Ok(types
        .into_iter()
        .map(|resource| ResourceRequest {
            resource: resource.to_lowercase(),
            names: rest.to_vec(),
            source: first.clone(),
        })
        .collect())
}

fn parse_type_name(arg: &str) -> Result<ResourceRequest, QueryError> {
    match arg.split_once('/') {
        Some((resource, name)) if !resource.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(ResourceRequest {
                resource: resource.to_lowercase(),
                names: vec![name.to_owned()],
                source: arg.to_owned(),
            })
        }
        _ => Err(QueryError::Malformed(arg.to_owned())),
    }
}
