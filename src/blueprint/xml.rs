//! Blueprint document parsing and serialization.
//!
//! The document is a small XML dialect: a `<blueprint>` root with
//! optional `<description>`, `<variables>`, `<resources>` and `<hooks>`
//! sections, plus an `<instance>` element on snapshot-embedded copies.
//! Unknown elements are skipped with a log line so older engines can
//! read newer documents.

use crate::actions::{
    copy_directory, Action, CopyDirectoryAction, CopyFileAction, DelimitedListEntryAction,
    EnvironmentAction, HostsEntryAction, MultiValueListEntryAction, RegistryAction, ServiceAction,
};
use crate::blueprint::{
    Blueprint, VAR_INSTALLDIR, VAR_PROJECT_DESCRIPTION, VAR_PROJECT_NAME, VAR_PROJECT_VERSION,
};
use crate::error::BlueprintError;
use crate::hooks::{Hook, KillProcessHook, RunProcessHook, RunQueryHook, SubstituteInFileHook};
use crate::types::{EnvScope, InsertPosition, InstanceMetadata, Phase};
use chrono::Local;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, BlueprintError> {
    match e.try_get_attribute(name)? {
        Some(attribute) => Ok(Some(attribute.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn require_attr(
    e: &BytesStart<'_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<String, BlueprintError> {
    attr(e, attribute)?.ok_or(BlueprintError::MissingAttribute { element, attribute })
}

fn parse_bool(
    raw: &str,
    element: &'static str,
    attribute: &'static str,
) -> Result<bool, BlueprintError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(BlueprintError::InvalidAttribute {
            element,
            attribute,
            value: raw.to_string(),
        }),
    }
}

fn phase_attr(e: &BytesStart<'_>, element: &'static str) -> Result<Phase, BlueprintError> {
    Phase::parse(&require_attr(e, element, "phase")?)
}

/// What the next text event belongs to.
enum TextTarget {
    None,
    Description,
    InstanceDescription,
    Var(String),
    Include,
    Exclude,
    Arg,
}

struct DocParser<'bp> {
    bp: &'bp mut Blueprint,
    saw_root: bool,
    in_instance: bool,
    instance: Option<InstanceMetadata>,
    target: TextTarget,
    text: String,
    pending_files: Option<CopyDirectoryAction>,
    pending_run: Option<(Phase, RunProcessHook)>,
}

impl<'bp> DocParser<'bp> {
    fn new(bp: &'bp mut Blueprint) -> Self {
        Self {
            bp,
            saw_root: false,
            in_instance: false,
            instance: None,
            target: TextTarget::None,
            text: String::new(),
            pending_files: None,
            pending_run: None,
        }
    }

    fn open(&mut self, e: &BytesStart<'_>, is_empty: bool) -> Result<(), BlueprintError> {
        self.target = TextTarget::None;
        self.text.clear();

        match e.name().as_ref() {
            b"blueprint" => {
                self.saw_root = true;
                let name = require_attr(e, "blueprint", "name")?;
                let version = require_attr(e, "blueprint", "version")?;
                self.bp.set_builtin(VAR_PROJECT_NAME, name);
                self.bp.set_builtin(VAR_PROJECT_VERSION, version);
                if let Some(installdir) = attr(e, "installdir")? {
                    self.bp.set_user_variable(VAR_INSTALLDIR, installdir)?;
                }
            }
            b"description" => {
                if !is_empty {
                    self.target = if self.in_instance {
                        TextTarget::InstanceDescription
                    } else {
                        TextTarget::Description
                    };
                }
            }
            b"instance" => {
                let raw_timestamp = require_attr(e, "instance", "timestamp")?;
                let timestamp = InstanceMetadata::parse_timestamp(&raw_timestamp).ok_or(
                    BlueprintError::InvalidAttribute {
                        element: "instance",
                        attribute: "timestamp",
                        value: raw_timestamp,
                    },
                )?;
                self.instance = Some(InstanceMetadata {
                    timestamp,
                    machine: require_attr(e, "instance", "machine")?,
                    user: require_attr(e, "instance", "user")?,
                    description: String::new(),
                });
                self.in_instance = !is_empty;
            }
            b"variables" | b"resources" | b"hooks" => {}
            b"var" => {
                let name = require_attr(e, "var", "name")?;
                if is_empty {
                    self.bp.set_user_variable(name, "")?;
                } else {
                    self.target = TextTarget::Var(name);
                }
            }
            b"file" => {
                self.bp.add_action(Action::CopyFile(CopyFileAction::new(
                    require_attr(e, "file", "path")?,
                    require_attr(e, "file", "archive")?,
                )));
            }
            b"files" => {
                let mut action = CopyDirectoryAction::new(
                    require_attr(e, "files", "path")?,
                    require_attr(e, "files", "archive")?,
                );
                if let Some(raw) = attr(e, "recursive")? {
                    action.recursive = parse_bool(&raw, "files", "recursive")?;
                }
                if is_empty {
                    self.bp.add_action(Action::CopyDirectory(action));
                } else {
                    self.pending_files = Some(action);
                }
            }
            b"include" => {
                if self.pending_files.is_some() && !is_empty {
                    self.target = TextTarget::Include;
                }
            }
            b"exclude" => {
                if self.pending_files.is_some() && !is_empty {
                    self.target = TextTarget::Exclude;
                }
            }
            b"registry" => {
                self.bp.add_action(Action::Registry(RegistryAction::new(
                    require_attr(e, "registry", "key")?,
                    require_attr(e, "registry", "archive")?,
                )));
            }
            b"environment" => {
                let scope = match attr(e, "scope")? {
                    None => EnvScope::User,
                    Some(raw) if raw.eq_ignore_ascii_case("user") => EnvScope::User,
                    Some(raw) if raw.eq_ignore_ascii_case("system") => EnvScope::System,
                    Some(raw) => {
                        return Err(BlueprintError::InvalidAttribute {
                            element: "environment",
                            attribute: "scope",
                            value: raw,
                        });
                    }
                };
                self.bp
                    .add_action(Action::Environment(EnvironmentAction::new(
                        require_attr(e, "environment", "name")?,
                        scope,
                        require_attr(e, "environment", "archive")?,
                    )));
            }
            b"delimited" => {
                let mut action = DelimitedListEntryAction::new(
                    require_attr(e, "delimited", "key")?,
                    require_attr(e, "delimited", "value")?,
                    require_attr(e, "delimited", "entry")?,
                    require_attr(e, "delimited", "archive")?,
                );
                if let Some(delimiter) = attr(e, "delimiter")? {
                    action.delimiter = delimiter;
                }
                if let Some(raw) = attr(e, "insert")? {
                    action.insert = if raw.eq_ignore_ascii_case("prepend") {
                        InsertPosition::Prepend
                    } else if raw.eq_ignore_ascii_case("append") {
                        InsertPosition::Append
                    } else {
                        return Err(BlueprintError::InvalidAttribute {
                            element: "delimited",
                            attribute: "insert",
                            value: raw,
                        });
                    };
                }
                self.bp.add_action(Action::DelimitedListEntry(action));
            }
            b"multistring" => {
                self.bp
                    .add_action(Action::MultiValueListEntry(MultiValueListEntryAction::new(
                        require_attr(e, "multistring", "key")?,
                        require_attr(e, "multistring", "value")?,
                        require_attr(e, "multistring", "entry")?,
                        require_attr(e, "multistring", "archive")?,
                    )));
            }
            b"service" => {
                self.bp.add_action(Action::Service(ServiceAction::new(
                    require_attr(e, "service", "name")?,
                    require_attr(e, "service", "archive")?,
                )));
            }
            b"hosts" => {
                self.bp.add_action(Action::HostsEntry(HostsEntryAction::new(
                    require_attr(e, "hosts", "hostname")?,
                    require_attr(e, "hosts", "archive")?,
                )));
            }
            b"kill" => {
                let phase = phase_attr(e, "kill")?;
                let mut hook = KillProcessHook::new(require_attr(e, "kill", "process")?);
                if let Some(raw) = attr(e, "timeout")? {
                    hook.timeout_ms =
                        raw.parse()
                            .map_err(|_| BlueprintError::InvalidAttribute {
                                element: "kill",
                                attribute: "timeout",
                                value: raw,
                            })?;
                }
                self.bp.add_hook(phase, Hook::KillProcess(hook));
            }
            b"run" => {
                let phase = phase_attr(e, "run")?;
                let mut hook = RunProcessHook::new(require_attr(e, "run", "path")?);
                if let Some(raw) = attr(e, "wait")? {
                    hook.wait = parse_bool(&raw, "run", "wait")?;
                }
                if let Some(raw) = attr(e, "ignore-exit-code")? {
                    hook.ignore_exit_code = parse_bool(&raw, "run", "ignore-exit-code")?;
                }
                if is_empty {
                    self.bp.add_hook(phase, Hook::RunProcess(hook));
                } else {
                    self.pending_run = Some((phase, hook));
                }
            }
            b"arg" => {
                if let Some((_, hook)) = &mut self.pending_run {
                    if is_empty {
                        hook.args.push(String::new());
                    } else {
                        self.target = TextTarget::Arg;
                    }
                }
            }
            b"substitute" => {
                let phase = phase_attr(e, "substitute")?;
                self.bp.add_hook(
                    phase,
                    Hook::SubstituteInFile(SubstituteInFileHook::new(require_attr(
                        e,
                        "substitute",
                        "file",
                    )?)),
                );
            }
            b"sql" => {
                let phase = phase_attr(e, "sql")?;
                self.bp.add_hook(
                    phase,
                    Hook::RunQuery(RunQueryHook::new(
                        require_attr(e, "sql", "file")?,
                        require_attr(e, "sql", "query")?,
                    )),
                );
            }
            other => {
                debug!(
                    "Skipping unknown element <{}>",
                    String::from_utf8_lossy(other)
                );
            }
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) -> Result<(), BlueprintError> {
        let target = std::mem::replace(&mut self.target, TextTarget::None);
        // Text arrives in fragments (entity references split them), so
        // surrounding whitespace is trimmed here, over the whole element.
        let text = std::mem::take(&mut self.text).trim().to_string();

        match (name, target) {
            (b"description", TextTarget::Description) => {
                self.bp.set_builtin(VAR_PROJECT_DESCRIPTION, text);
            }
            (b"description", TextTarget::InstanceDescription) => {
                if let Some(instance) = &mut self.instance {
                    instance.description = text;
                }
            }
            (b"var", TextTarget::Var(var_name)) => {
                self.bp.set_user_variable(var_name, text)?;
            }
            (b"include", TextTarget::Include) => {
                if let Some(action) = &mut self.pending_files {
                    action.include.push(text);
                }
            }
            (b"exclude", TextTarget::Exclude) => {
                if let Some(action) = &mut self.pending_files {
                    action.exclude.push(text);
                }
            }
            (b"arg", TextTarget::Arg) => {
                if let Some((_, hook)) = &mut self.pending_run {
                    hook.args.push(text);
                }
            }
            (b"files", _) => {
                if let Some(action) = self.pending_files.take() {
                    copy_directory::validate_patterns(&action.include)?;
                    copy_directory::validate_patterns(&action.exclude)?;
                    self.bp.add_action(Action::CopyDirectory(action));
                }
            }
            (b"run", _) => {
                if let Some((phase, hook)) = self.pending_run.take() {
                    self.bp.add_hook(phase, Hook::RunProcess(hook));
                }
            }
            (b"instance", _) => {
                self.in_instance = false;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Parse a document into `bp`. Returns capture metadata when the
/// document carries an `<instance>` element.
pub(super) fn parse_into(
    bp: &mut Blueprint,
    document: &str,
) -> Result<Option<InstanceMetadata>, BlueprintError> {
    let mut reader = Reader::from_str(document);

    let mut parser = DocParser::new(bp);
    loop {
        match reader.read_event()? {
            Event::Start(e) => parser.open(&e, false)?,
            Event::Empty(e) => parser.open(&e, true)?,
            Event::Text(e) => {
                if !matches!(parser.target, TextTarget::None) {
                    parser
                        .text
                        .push_str(&e.decode().map_err(quick_xml::Error::from)?);
                }
            }
            // Entity references come as their own events; resolve the
            // character and predefined forms inline.
            Event::GeneralRef(e) => {
                if !matches!(parser.target, TextTarget::None) {
                    if let Some(ch) = e.resolve_char_ref().map_err(quick_xml::Error::from)? {
                        parser.text.push(ch);
                    } else {
                        let name = e.decode().map_err(quick_xml::Error::from)?;
                        match quick_xml::escape::resolve_predefined_entity(&name) {
                            Some(resolved) => parser.text.push_str(resolved),
                            None => {
                                return Err(BlueprintError::UnknownEntity(name.into_owned()));
                            }
                        }
                    }
                }
            }
            Event::End(e) => parser.close(e.name().as_ref())?,
            Event::Eof => break,
            _ => {}
        }
    }

    if !parser.saw_root {
        return Err(BlueprintError::MissingRoot);
    }
    Ok(parser.instance)
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), BlueprintError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Serialize a blueprint (optionally with instance metadata) back to the
/// document form. User variables are written with their raw, unresolved
/// values so the document stays machine-independent.
pub(super) fn serialize(
    bp: &Blueprint,
    instance: Option<&InstanceMetadata>,
) -> Result<String, BlueprintError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("blueprint");
    root.push_attribute(("name", bp.name()));
    root.push_attribute(("version", bp.version()));
    let installdir = bp
        .user_variables()
        .iter()
        .find(|(name, _)| name == VAR_INSTALLDIR);
    if let Some((_, raw)) = installdir {
        root.push_attribute(("installdir", raw.as_str()));
    }
    writer.write_event(Event::Start(root))?;

    if !bp.description().is_empty() {
        write_text_element(&mut writer, "description", bp.description())?;
    }

    if let Some(meta) = instance {
        let timestamp = meta.timestamp_string();
        let mut el = BytesStart::new("instance");
        el.push_attribute(("timestamp", timestamp.as_str()));
        el.push_attribute(("machine", meta.machine.as_str()));
        el.push_attribute(("user", meta.user.as_str()));
        if meta.description.is_empty() {
            writer.write_event(Event::Empty(el))?;
        } else {
            writer.write_event(Event::Start(el))?;
            write_text_element(&mut writer, "description", &meta.description)?;
            writer.write_event(Event::End(BytesEnd::new("instance")))?;
        }
    }

    let user_vars: Vec<&(String, String)> = bp
        .user_variables()
        .iter()
        .filter(|(name, _)| name != VAR_INSTALLDIR)
        .collect();
    if !user_vars.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("variables")))?;
        for (name, value) in user_vars {
            let mut el = BytesStart::new("var");
            el.push_attribute(("name", name.as_str()));
            if value.is_empty() {
                writer.write_event(Event::Empty(el))?;
            } else {
                writer.write_event(Event::Start(el))?;
                writer.write_event(Event::Text(BytesText::new(value)))?;
                writer.write_event(Event::End(BytesEnd::new("var")))?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new("variables")))?;
    }

    if !bp.actions().is_empty() {
        writer.write_event(Event::Start(BytesStart::new("resources")))?;
        for action in bp.actions() {
            let mut el = BytesStart::new(action.kind());
            for (key, value) in action.to_params() {
                el.push_attribute((key, value.as_str()));
            }
            match action {
                Action::CopyDirectory(a) if !a.include.is_empty() || !a.exclude.is_empty() => {
                    writer.write_event(Event::Start(el))?;
                    for pattern in &a.include {
                        write_text_element(&mut writer, "include", pattern)?;
                    }
                    for pattern in &a.exclude {
                        write_text_element(&mut writer, "exclude", pattern)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new(action.kind())))?;
                }
                _ => writer.write_event(Event::Empty(el))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new("resources")))?;
    }

    let has_hooks = Phase::ALL.iter().any(|phase| !bp.hooks(*phase).is_empty());
    if has_hooks {
        writer.write_event(Event::Start(BytesStart::new("hooks")))?;
        for phase in Phase::ALL {
            for hook in bp.hooks(phase) {
                let mut el = BytesStart::new(hook.kind());
                el.push_attribute(("phase", phase.as_str()));
                for (key, value) in hook.to_params() {
                    el.push_attribute((key, value.as_str()));
                }
                match hook {
                    Hook::RunProcess(h) if !h.args.is_empty() => {
                        writer.write_event(Event::Start(el))?;
                        for arg in &h.args {
                            write_text_element(&mut writer, "arg", arg)?;
                        }
                        writer.write_event(Event::End(BytesEnd::new(hook.kind())))?;
                    }
                    _ => writer.write_event(Event::Empty(el))?,
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new("hooks")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("blueprint")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|err| BlueprintError::Io(std::io::Error::other(err)))
}

/// Fallback metadata for snapshots whose embedded document predates the
/// `<instance>` element.
pub(super) fn fallback_instance_metadata(bp: &Blueprint) -> InstanceMetadata {
    InstanceMetadata {
        timestamp: Local::now(),
        machine: bp.var("COMPUTERNAME").to_string(),
        user: bp.var("USERNAME").to_string(),
        description: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<blueprint name="Acme" version="2.1" installdir="C:\Apps\Acme">
  <description>Acme suite</description>
  <variables>
    <var name="DATADIR">${INSTALLDIR}\data</var>
  </variables>
  <resources>
    <file path="${DATADIR}\app.ini" archive="files/app.ini"/>
    <files path="${INSTALLDIR}" archive="files/install" recursive="true">
      <include>*.ini</include>
      <exclude>*.tmp</exclude>
    </files>
    <registry key="HKCU\Software\Acme" archive="registry/acme.reg"/>
    <environment name="ACME_HOME" scope="system" archive="env/ACME_HOME"/>
    <delimited key="HKLM\Env" value="Path" entry="${INSTALLDIR}\bin" insert="prepend" archive="list/path.txt"/>
    <multistring key="HKLM\Providers" value="List" entry="acme" archive="list/provider.txt"/>
    <service name="acmed" archive="service/acmed.toml"/>
    <hosts hostname="acme.local" archive="hosts/acme.toml"/>
  </resources>
  <hooks>
    <kill phase="pre-backup" process="acme.exe" timeout="2000"/>
    <run phase="PostRestore" path="${INSTALLDIR}\setup.exe" ignore-exit-code="true">
      <arg>--quiet</arg>
      <arg>--dir=${INSTALLDIR}</arg>
    </run>
    <substitute phase="pre-backup" file="${DATADIR}\*.conf"/>
    <sql phase="post-restore" file="${DATADIR}\app.db" query="UPDATE t SET v = '${INSTALLDIR}'"/>
  </hooks>
</blueprint>
"#;

    #[test]
    fn test_parse_full_document() {
        let bp = Blueprint::from_document(DOC).unwrap();

        assert_eq!(bp.name(), "Acme");
        assert_eq!(bp.version(), "2.1");
        assert_eq!(bp.description(), "Acme suite");
        assert_eq!(bp.var(VAR_INSTALLDIR), "C:\\Apps\\Acme");
        assert_eq!(bp.var("DATADIR"), "C:\\Apps\\Acme\\data");
        assert_eq!(bp.actions().len(), 8);

        match &bp.actions()[1] {
            Action::CopyDirectory(a) => {
                assert!(a.recursive);
                assert_eq!(a.include, vec!["*.ini".to_string()]);
                assert_eq!(a.exclude, vec!["*.tmp".to_string()]);
            }
            other => panic!("unexpected action: {other:?}"),
        }
        match &bp.actions()[4] {
            Action::DelimitedListEntry(a) => {
                assert_eq!(a.insert, InsertPosition::Prepend);
                assert_eq!(a.delimiter, ";");
            }
            other => panic!("unexpected action: {other:?}"),
        }

        assert_eq!(bp.hooks(Phase::PreBackup).len(), 2);
        assert_eq!(bp.hooks(Phase::PostRestore).len(), 2);
        match &bp.hooks(Phase::PostRestore)[0] {
            Hook::RunProcess(h) => {
                assert!(h.ignore_exit_code);
                assert!(h.wait);
                assert_eq!(h.args, vec!["--quiet", "--dir=${INSTALLDIR}"]);
            }
            other => panic!("unexpected hook: {other:?}"),
        }
        match &bp.hooks(Phase::PreBackup)[0] {
            Hook::KillProcess(h) => assert_eq!(h.timeout_ms, 2000),
            other => panic!("unexpected hook: {other:?}"),
        }
    }

    #[test]
    fn test_serialize_parse_round_trip() {
        let bp = Blueprint::from_document(DOC).unwrap();
        let doc = bp.to_document().unwrap();
        let reparsed = Blueprint::from_document(&doc).unwrap();

        assert_eq!(reparsed.name(), bp.name());
        assert_eq!(reparsed.version(), bp.version());
        assert_eq!(reparsed.description(), bp.description());
        assert_eq!(reparsed.user_variables(), bp.user_variables());
        assert_eq!(reparsed.actions().len(), bp.actions().len());
        for (a, b) in reparsed.actions().iter().zip(bp.actions()) {
            assert_eq!(a.kind(), b.kind());
            assert_eq!(a.to_params(), b.to_params());
        }
        for phase in Phase::ALL {
            assert_eq!(reparsed.hooks(phase).len(), bp.hooks(phase).len());
            for (a, b) in reparsed.hooks(phase).iter().zip(bp.hooks(phase)) {
                assert_eq!(a.kind(), b.kind());
                assert_eq!(a.to_params(), b.to_params());
            }
        }
    }

    #[test]
    fn test_missing_required_attribute() {
        let doc = r#"<blueprint name="x" version="1"><resources><file path="a"/></resources></blueprint>"#;
        assert!(matches!(
            Blueprint::from_document(doc),
            Err(BlueprintError::MissingAttribute {
                element: "file",
                attribute: "archive"
            })
        ));
    }

    #[test]
    fn test_missing_root() {
        assert!(matches!(
            Blueprint::from_document("<other/>"),
            Err(BlueprintError::MissingRoot)
        ));
    }

    #[test]
    fn test_invalid_phase_rejected() {
        let doc = r#"<blueprint name="x" version="1"><hooks><kill phase="mid-backup" process="a"/></hooks></blueprint>"#;
        assert!(matches!(
            Blueprint::from_document(doc),
            Err(BlueprintError::InvalidPhase(_))
        ));
    }

    #[test]
    fn test_escaped_values_survive() {
        let doc = r#"<blueprint name="A &amp; B" version="1"><variables><var name="Q">a &lt; b</var></variables></blueprint>"#;
        let bp = Blueprint::from_document(doc).unwrap();
        assert_eq!(bp.name(), "A & B");
        assert_eq!(bp.var("Q"), "a < b");

        let round = bp.to_document().unwrap();
        let reparsed = Blueprint::from_document(&round).unwrap();
        assert_eq!(reparsed.name(), "A & B");
        assert_eq!(reparsed.var("Q"), "a < b");
    }

    #[test]
    fn test_character_references_in_text() {
        let doc = r#"<blueprint name="x" version="1"><variables><var name="Q">A&#66;&#x43; &quot;q&quot;</var></variables></blueprint>"#;
        let bp = Blueprint::from_document(doc).unwrap();
        assert_eq!(bp.var("Q"), "ABC \"q\"");
    }

    #[test]
    fn test_unknown_entity_rejected() {
        let doc = r#"<blueprint name="x" version="1"><variables><var name="Q">&nbsp;</var></variables></blueprint>"#;
        match Blueprint::from_document(doc) {
            Err(BlueprintError::UnknownEntity(name)) => assert_eq!(name, "nbsp"),
            other => panic!("expected unknown-entity error, got {other:?}"),
        }
    }
}
