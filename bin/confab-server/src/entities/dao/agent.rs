/// A row in the `agents` table.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: String,
    pub name: String,
}

/// One knowledge-base document of an agent.
#[derive(Debug, Clone)]
pub struct AgentDocument {
    pub name: String,
    pub url: String,
}
