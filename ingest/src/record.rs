use serde::{Deserialize, Serialize};

/// Canonical columns of a call record, in storage order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    CallId,
    CallerNumber,
    CalleeNumber,
    CallType,
    CallTime,
    AgentCallTime,
    Department,
    AgentName,
    AgentId,
    CallStatus,
    SkillGroup,
    EndNode,
    KeyTrack,
    Province,
    City,
    PbxName,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::CallId,
        Field::CallerNumber,
        Field::CalleeNumber,
        Field::CallType,
        Field::CallTime,
        Field::AgentCallTime,
        Field::Department,
        Field::AgentName,
        Field::AgentId,
        Field::CallStatus,
        Field::SkillGroup,
        Field::EndNode,
        Field::KeyTrack,
        Field::Province,
        Field::City,
        Field::PbxName,
    ];

    /// The business key used for upserts.
    pub const KEY: Field = Field::CallId;

    /// Column name, also the key expected in JSON submissions.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Field::CallId => "call_id",
            Field::CallerNumber => "caller_number",
            Field::CalleeNumber => "callee_number",
            Field::CallType => "call_type",
            Field::CallTime => "call_time",
            Field::AgentCallTime => "agent_call_time",
            Field::Department => "department",
            Field::AgentName => "agent_name",
            Field::AgentId => "agent_id",
            Field::CallStatus => "call_status",
            Field::SkillGroup => "skill_group",
            Field::EndNode => "end_node",
            Field::KeyTrack => "key_track",
            Field::Province => "province",
            Field::City => "city",
            Field::PbxName => "pbx_name",
        }
    }
}

/// One normalized call interaction, ready to be persisted.
///
/// Every value is kept as submitted; no numeric or date parsing happens here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub call_id: String,
    pub caller_number: String,
    pub callee_number: String,
    pub call_type: String,
    pub call_time: String,
    pub agent_call_time: String,
    pub department: String,
    pub agent_name: String,
    pub agent_id: String,
    pub call_status: String,
    pub skill_group: String,
    pub end_node: String,
    pub key_track: String,
    pub province: String,
    pub city: String,
    pub pbx_name: String,
}

impl CanonicalRecord {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::CallId => &self.call_id,
            Field::CallerNumber => &self.caller_number,
            Field::CalleeNumber => &self.callee_number,
            Field::CallType => &self.call_type,
            Field::CallTime => &self.call_time,
            Field::AgentCallTime => &self.agent_call_time,
            Field::Department => &self.department,
            Field::AgentName => &self.agent_name,
            Field::AgentId => &self.agent_id,
            Field::CallStatus => &self.call_status,
            Field::SkillGroup => &self.skill_group,
            Field::EndNode => &self.end_node,
            Field::KeyTrack => &self.key_track,
            Field::Province => &self.province,
            Field::City => &self.city,
            Field::PbxName => &self.pbx_name,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::CallId => &mut self.call_id,
            Field::CallerNumber => &mut self.caller_number,
            Field::CalleeNumber => &mut self.callee_number,
            Field::CallType => &mut self.call_type,
            Field::CallTime => &mut self.call_time,
            Field::AgentCallTime => &mut self.agent_call_time,
            Field::Department => &mut self.department,
            Field::AgentName => &mut self.agent_name,
            Field::AgentId => &mut self.agent_id,
            Field::CallStatus => &mut self.call_status,
            Field::SkillGroup => &mut self.skill_group,
            Field::EndNode => &mut self.end_node,
            Field::KeyTrack => &mut self.key_track,
            Field::Province => &mut self.province,
            Field::City => &mut self.city,
            Field::PbxName => &mut self.pbx_name,
        };
        *slot = value;
    }

    /// Values in column order, as used for statement parameters.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        Field::ALL.iter().map(|field| self.get(*field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_are_unique() {
        let names: HashSet<_> = Field::ALL.iter().map(|f| f.as_str()).collect();
        assert_eq!(names.len(), Field::ALL.len());
        assert_eq!(Field::ALL[0], Field::KEY);
    }

    #[test]
    fn test_set_and_get_cover_every_field() {
        let mut record = CanonicalRecord::default();
        for field in Field::ALL {
            record.set(field, field.as_str().to_uppercase());
        }
        for field in Field::ALL {
            assert_eq!(record.get(field), field.as_str().to_uppercase());
        }
        assert_eq!(record.values().count(), 16);
        assert_eq!(record.values().next(), Some("CALL_ID"));
    }
}
