// src/clustering/queries.rs

//! Fixed Cypher statements used by the pipeline. Pairs are deduplicated by
//! name ordering so the result does not depend on internal node ids.

/// Every group with the names of the topics it carries.
pub const GROUP_TOPICS_QUERY: &str = "
    MATCH (group:Group)-[:HAS_TOPIC]->(topic:Topic)
    RETURN group.name AS group, collect(topic.name) AS topics
    ORDER BY group
";

/// Unordered topic pairs sharing at least one group, weighted by the number
/// of shared groups.
pub const TOPIC_CO_OCCURRENCE_QUERY: &str = "
    MATCH (topic:Topic)<-[:HAS_TOPIC]-(:Group)-[:HAS_TOPIC]->(other:Topic)
    WHERE topic.name < other.name
    RETURN topic.name AS topic, other.name AS other, count(*) AS weight
    ORDER BY weight DESC, topic, other
";

/// Links each topic in `$assignments` to the Cluster named by its id.
pub const WRITE_CLUSTERS_QUERY: &str = "
    UNWIND $assignments AS assignment
    MATCH (topic:Topic {name: assignment.name})
    MERGE (cluster:Cluster {name: assignment.cluster})
    MERGE (topic)-[:IN_CLUSTER]->(cluster)
    RETURN count(*) AS linked
";

/// Parameter name carrying the write batch.
pub const ASSIGNMENTS_PARAM: &str = "assignments";
