//! RDF vocabulary IRIs used by the filter encoding.
//!
//! Grouped by vocabulary. Only the terms the encoding actually writes or
//! reads are listed here.

/// RDF vocabulary (http://www.w3.org/1999/02/22-rdf-syntax-ns#)
pub mod rdf {
    /// rdf:type
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

    /// rdf:first (RDF list head)
    pub const FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";

    /// rdf:rest (RDF list tail)
    pub const REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";

    /// rdf:nil (RDF list terminator)
    pub const NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";

    /// rdf:value
    pub const VALUE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#value";
}

/// RDFS vocabulary
pub mod rdfs {
    pub const LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
}

/// XSD datatypes
pub mod xsd {
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
}

/// SHACL vocabulary (http://www.w3.org/ns/shacl#)
pub mod sh {
    pub const NODE_SHAPE: &str = "http://www.w3.org/ns/shacl#NodeShape";
    pub const PROPERTY_SHAPE: &str = "http://www.w3.org/ns/shacl#PropertyShape";
    pub const PATH: &str = "http://www.w3.org/ns/shacl#path";
    pub const PATTERN: &str = "http://www.w3.org/ns/shacl#pattern";
    pub const FLAGS: &str = "http://www.w3.org/ns/shacl#flags";
    pub const MIN_COUNT: &str = "http://www.w3.org/ns/shacl#minCount";
    pub const MAX_COUNT: &str = "http://www.w3.org/ns/shacl#maxCount";

    /// Conjunction over a list of shapes.
    pub const AND: &str = "http://www.w3.org/ns/shacl#and";

    /// Disjunction over a list of shapes.
    pub const OR: &str = "http://www.w3.org/ns/shacl#or";
}

/// Dublin Core terms
pub mod dct {
    pub const TITLE: &str = "http://purl.org/dc/terms/title";
    pub const DESCRIPTION: &str = "http://purl.org/dc/terms/description";
    pub const PUBLISHER: &str = "http://purl.org/dc/terms/publisher";
    pub const SPATIAL: &str = "http://purl.org/dc/terms/spatial";
    pub const CREATED: &str = "http://purl.org/dc/terms/created";
}

/// DCAT vocabulary
pub mod dcat {
    pub const KEYWORD: &str = "http://www.w3.org/ns/dcat#keyword";
    pub const THEME: &str = "http://www.w3.org/ns/dcat#theme";
}

/// FOAF vocabulary
pub mod foaf {
    pub const NAME: &str = "http://xmlns.com/foaf/0.1/name";
}

/// SKOS vocabulary
pub mod skos {
    pub const PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";
}

/// Shapewatch's own terms for subscribers.
pub mod sw {
    pub const NS: &str = "http://shapewatch.dev/ns#";
    pub const SUBSCRIBER: &str = "http://shapewatch.dev/ns#Subscriber";
    pub const EMAIL: &str = "http://shapewatch.dev/ns#email";

    /// Hex SHA-256 of the subscriber's access token. The token itself is
    /// never stored.
    pub const TOKEN_DIGEST: &str = "http://shapewatch.dev/ns#tokenDigest";
    pub const HAS_SUBSCRIPTION: &str = "http://shapewatch.dev/ns#hasSubscription";
}
