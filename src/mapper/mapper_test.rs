/// Tests for the schema-driven mappers
///
/// Fixtures are small hand-checked schema/content pairs for each walker.
#[cfg(test)]
mod tests {
    use crate::mapper::*;
    use crate::model::{RawValue, ResultTree, ResultValue};
    use crate::schema::{Format, FormatMask, Schema};

    const RECORD_SCHEMA: &str = r#"{
        "type": "object",
        "required": ["results"],
        "properties": {
            "host": { "type": "string", "role": "parameter" },
            "results": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "value"],
                    "properties": {
                        "name": { "type": "string", "role": "name" },
                        "value": { "type": "number", "condensed": true, "pass": { "op": "<=", "threshold": 100 } },
                        "unit": { "type": "string", "role": "unit" },
                        "description": { "type": "string", "role": "description" }
                    }
                }
            }
        }
    }"#;

    const RECORD_CONTENT: &str = r#"{
        "host": "ci-1",
        "results": [
            { "name": "latency", "value": 12.5, "unit": "ms", "description": "p50" },
            { "name": "throughput", "value": 800, "unit": "ops/s", "description": "mean" }
        ]
    }"#;

    fn json_mapper(schema: &str) -> JsonMapper {
        JsonMapper::new(schema, MapperOptions::default()).unwrap()
    }

    fn find<'a>(tree: &'a ResultTree, name: &str) -> &'a ResultValue {
        tree.values().into_iter().map(|(_, v)| v).find(|v| v.name == name).unwrap()
    }

    #[test]
    fn test_json_records_collapse_to_named_results() {
        let tree = json_mapper(RECORD_SCHEMA).map(RECORD_CONTENT).unwrap();
        assert_eq!(tree.number_of_results(), 2);
        assert_eq!(tree.number_of_parameters(), 1);

        let latency = find(&tree, "latency");
        assert_eq!(latency.value, RawValue::Float(12.5));
        assert_eq!(latency.unit.as_deref(), Some("ms"));
        assert_eq!(latency.description.as_deref(), Some("p50"));
        assert_eq!(latency.group.as_deref(), Some("results"));
        assert!(latency.condense);

        // Integer content coerced to the declared float type
        let throughput = find(&tree, "throughput");
        assert_eq!(throughput.value, RawValue::Float(800.0));
        assert!(!throughput.passed());
    }

    #[test]
    fn test_json_missing_required_is_missing_property() {
        let content = r#"{ "results": [ { "name": "latency", "value": 1 }, { "name": "throughput" } ] }"#;
        let err = json_mapper(RECORD_SCHEMA).map(content).unwrap_err();
        assert!(err.is_missing_property(), "got {:?}", err);
        assert!(!err.is_validation());
        assert!(err.to_string().contains("$.results[1].value"));
    }

    #[test]
    fn test_json_optional_absent_yields_no_value() {
        let tree = json_mapper(RECORD_SCHEMA).map(r#"{ "results": [] }"#).unwrap();
        assert_eq!(tree.number_of_parameters(), 0);
        assert_eq!(tree.number_of_results(), 0);
    }

    #[test]
    fn test_json_type_mismatch_is_validation() {
        let content = r#"{ "results": [ { "name": "latency", "value": "fast" } ] }"#;
        let err = json_mapper(RECORD_SCHEMA).map(content).unwrap_err();
        assert!(err.is_validation());
        let msg = err.to_string();
        assert!(msg.contains("$.results[0].value"), "{}", msg);
        assert!(msg.contains("expected float, found string"), "{}", msg);
    }

    #[test]
    fn test_json_undeclared_property_rejected() {
        let content = r#"{ "results": [], "extra": 1 }"#;
        let err = json_mapper(RECORD_SCHEMA).map(content).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_json_additional_properties_pass_through_as_strings() {
        let schema = r#"{
            "type": "object",
            "additionalProperties": true,
            "properties": { "elapsed": { "type": "integer", "unit": "ms" } }
        }"#;
        let tree = json_mapper(schema).map(r#"{ "elapsed": 42, "runner": "linux", "cores": 8 }"#).unwrap();
        assert_eq!(tree.number_of_results(), 1);
        assert_eq!(tree.number_of_parameters(), 2);
        assert_eq!(find(&tree, "cores").value, RawValue::String("8".to_string()));
        assert_eq!(find(&tree, "elapsed").unit.as_deref(), Some("ms"));
    }

    #[test]
    fn test_json_keyed_array_groups_and_mapped_names() {
        let schema = r#"{
            "type": "array",
            "key": "id",
            "items": {
                "type": "object",
                "properties": {
                    "id": { "type": "string", "role": "parameter" },
                    "Wall time": { "type": "number", "mapped": "wall" },
                    "ok": { "type": "boolean" }
                }
            }
        }"#;
        let content = r#"[ { "id": "parse", "wall": 1.5, "ok": true }, { "id": "emit", "wall": 2, "ok": false } ]"#;
        let tree = json_mapper(schema).map(content).unwrap();
        let rows = tree.rows("");
        let keys: Vec<String> = rows.iter().map(|r| format!("{}:{}", r.key.group, r.key.name)).collect();
        // Results first, then parameters, per element group
        assert_eq!(keys, vec!["parse:Wall time", "parse:ok", "parse:id", "emit:Wall time", "emit:ok", "emit:id"]);
    }

    #[test]
    fn test_json_array_of_leaves_indexed() {
        let schema = r#"{
            "type": "object",
            "properties": { "samples": { "type": "array", "items": { "type": "integer" } } }
        }"#;
        let tree = json_mapper(schema).map(r#"{ "samples": [3, 5, 8] }"#).unwrap();
        assert_eq!(tree.number_of_results(), 3);
        assert_eq!(find(&tree, "2").value, RawValue::Integer(8));
    }

    #[test]
    fn test_empty_documents_give_empty_trees() {
        assert!(json_mapper(RECORD_SCHEMA).map("  \n").unwrap().is_empty());
        assert!(json_mapper(RECORD_SCHEMA).map("null").unwrap().is_empty());
        assert!(JUnitMapper::new().map("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = json_mapper(RECORD_SCHEMA).map("{ not json").unwrap_err();
        assert!(matches!(err, crate::error::MapError::Parse { format: "JSON", .. }));
    }

    #[test]
    fn test_truncation_applies_to_strings_only() {
        let schema = r#"{
            "type": "object",
            "properties": {
                "commit": { "type": "string", "role": "parameter" },
                "score": { "type": "float" }
            }
        }"#;
        let options = MapperOptions { truncate_strings: Some(7) };
        let mapper = JsonMapper::new(schema, options).unwrap();
        let tree = mapper.map(r#"{ "commit": "9f8e7d6c5b4a", "score": 123456.789 }"#).unwrap();
        assert_eq!(find(&tree, "commit").value, RawValue::String("9f8e7d6".to_string()));
        assert_eq!(find(&tree, "score").value, RawValue::Float(123456.789));
    }

    #[test]
    fn test_bad_schema_is_config_error() {
        assert!(JsonMapper::new("{", MapperOptions::default()).unwrap_err().is_config());
        let unknown_type = r#"{ "type": "object", "properties": { "x": { "type": "decimal128" } } }"#;
        assert!(JsonMapper::new(unknown_type, MapperOptions::default()).unwrap_err().is_config());
    }

    #[test]
    fn test_format_bit_checked_before_mapping() {
        let schema = Schema::new("perf", "perf.json", None, FormatMask::JSON);
        let err = build_mapper_from_str(&schema, Format::Xml, "<xs:schema/>", MapperOptions::default()).err().unwrap();
        assert!(err.is_config());
        assert!(build_mapper_from_str(&schema, Format::Json, RECORD_SCHEMA, MapperOptions::default()).is_ok());
    }

    const XSD: &str = r#"<?xml version="1.0"?>
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="benchmark">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="run" maxOccurs="unbounded" key="id">
                  <xs:complexType>
                    <xs:sequence>
                      <xs:element name="time" type="xs:double" unit="ms" condensed="true" pass="&lt;= 100"/>
                      <xs:element name="ok" type="xs:boolean"/>
                      <xs:element name="note" type="xs:string" minOccurs="0" role="parameter"/>
                    </xs:sequence>
                    <xs:attribute name="id" type="xs:string" use="required" role="parameter"/>
                  </xs:complexType>
                </xs:element>
              </xs:sequence>
              <xs:attribute name="host" type="xs:string" role="parameter"/>
            </xs:complexType>
          </xs:element>
        </xs:schema>"#;

    fn xml_mapper() -> XmlMapper {
        XmlMapper::new(XSD, MapperOptions::default()).unwrap()
    }

    #[test]
    fn test_xml_repeated_elements_keyed() {
        let content = r#"<benchmark host="ci-1">
            <run id="a"><time>12.5</time><ok>true</ok></run>
            <run id="b"><time>140</time><ok>false</ok><note>slow disk</note></run>
        </benchmark>"#;
        let tree = xml_mapper().map(content).unwrap();
        assert_eq!(tree.number_of_results(), 4);
        assert_eq!(tree.number_of_parameters(), 4);

        let rows = tree.rows("bench.xml");
        let time_b = rows.iter().find(|r| r.key.group == "run/b" && r.key.name == "time").unwrap();
        assert_eq!(time_b.value.value, RawValue::Float(140.0));
        assert_eq!(time_b.value.unit.as_deref(), Some("ms"));
        assert!(!time_b.value.passed());
    }

    #[test]
    fn test_xml_missing_required_element() {
        let content = r#"<benchmark><run id="a"><time>1</time></run></benchmark>"#;
        let err = xml_mapper().map(content).unwrap_err();
        assert!(err.is_missing_property(), "got {:?}", err);
        assert!(err.to_string().contains("/benchmark/run[0]/ok"));
    }

    #[test]
    fn test_xml_missing_required_attribute() {
        let content = r#"<benchmark><run><time>1</time><ok>true</ok></run></benchmark>"#;
        assert!(xml_mapper().map(content).unwrap_err().is_missing_property());
    }

    #[test]
    fn test_xml_type_mismatch_and_wrong_root() {
        let content = r#"<benchmark><run id="a"><time>soon</time><ok>true</ok></run></benchmark>"#;
        assert!(xml_mapper().map(content).unwrap_err().is_validation());
        assert!(xml_mapper().map("<other/>").unwrap_err().is_validation());
    }

    #[test]
    fn test_xml_non_finite_double_rejected() {
        for text in ["NaN", "INF", "-inf"] {
            let content = format!(r#"<benchmark><run id="a"><time>{}</time><ok>true</ok></run></benchmark>"#, text);
            let err = xml_mapper().map(&content).unwrap_err();
            assert!(err.is_validation(), "{}: got {:?}", text, err);
            assert!(err.to_string().contains("finite"));
        }
    }

    #[test]
    fn test_xml_additional_properties_pass_through_as_strings() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:element name="run">
                <xs:complexType>
                  <xs:sequence>
                    <xs:element name="elapsed" type="xs:integer" unit="ms"/>
                    <xs:any minOccurs="0" maxOccurs="unbounded"/>
                  </xs:sequence>
                  <xs:anyAttribute/>
                </xs:complexType>
              </xs:element>
            </xs:schema>"#;
        let mapper = XmlMapper::new(xsd, MapperOptions::default()).unwrap();
        let tree = mapper.map(r#"<run runner="linux"><elapsed>42</elapsed><cores> 8 </cores></run>"#).unwrap();
        assert_eq!(tree.number_of_results(), 1);
        assert_eq!(tree.number_of_parameters(), 2);
        assert_eq!(find(&tree, "runner").value, RawValue::String("linux".to_string()));
        assert_eq!(find(&tree, "cores").value, RawValue::String("8".to_string()));
        assert_eq!(find(&tree, "elapsed").unit.as_deref(), Some("ms"));
    }

    #[test]
    fn test_xml_undeclared_element_rejected() {
        let content = r#"<benchmark><run id="a"><time>1</time><ok>true</ok><extra/></run></benchmark>"#;
        assert!(xml_mapper().map(content).unwrap_err().is_validation());
    }

    #[test]
    fn test_junit_report_mapping() {
        let report = r#"<?xml version="1.0" encoding="UTF-8"?>
            <testsuites>
              <testsuite name="core" tests="3" time="1.5">
                <testcase classname="core.Parser" name="parses" time="0.5"/>
                <testcase classname="core.Parser" name="rejects" time="0.7"><failure message="boom"/></testcase>
                <testcase classname="core.Parser" name="later" time="0"><skipped/></testcase>
              </testsuite>
            </testsuites>"#;
        let tree = JUnitMapper::new().map(report).unwrap();
        assert_eq!(tree.number_of_results(), 7);
        assert_eq!(tree.number_of_parameters(), 1);

        let rows = tree.rows(JUNIT_RESULT_FILE);
        let failures = rows.iter().find(|r| r.key.group == "core" && r.key.name == "failures").unwrap();
        assert_eq!(failures.value.value, RawValue::Integer(1));
        assert!(!failures.value.passed());

        let rejects =
            rows.iter().find(|r| r.key.group == "core/cases/core.Parser.rejects" && r.key.name == "status").unwrap();
        assert_eq!(rejects.value.value, RawValue::Boolean(false));
    }

    #[test]
    fn test_junit_stored_result_mapping() {
        let stored = r#"<result>
            <suites>
              <suite>
                <name>api</name>
                <duration>2.0</duration>
                <cases>
                  <case><className>api.Login</className><testName>works</testName><duration>1.0</duration><skipped>false</skipped></case>
                  <case><className>api.Login</className><testName>locks</testName><duration>1.0</duration><skipped>false</skipped><errorDetails>expected 3</errorDetails></case>
                </cases>
              </suite>
            </suites>
        </result>"#;
        let tree = JUnitMapper::new().map(stored).unwrap();
        let rows = tree.rows("");
        let statuses: Vec<bool> = rows
            .iter()
            .filter(|r| r.key.name == "status")
            .map(|r| r.value.value == RawValue::Boolean(true))
            .collect();
        assert_eq!(statuses, vec![true, false]);
    }

    #[test]
    fn test_junit_non_finite_duration_rejected() {
        let report = r#"<testsuite name="core" time="NaN"><testcase name="parses"/></testsuite>"#;
        assert!(JUnitMapper::new().map(report).unwrap_err().is_validation());
    }

    #[test]
    fn test_junit_unknown_root_rejected() {
        assert!(JUnitMapper::new().map("<report/>").unwrap_err().is_validation());
    }
}
