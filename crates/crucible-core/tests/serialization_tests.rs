//! Serialization roundtrip tests for crucible-core wire types.

use crucible_core::ids::{HwGroupId, TestId};
use crucible_core::job::{JobConfig, SubmissionHeader};
use crucible_core::limits::{BoundDirectory, Limits};
use crucible_core::sandbox::SandboxConfig;
use crucible_core::task::{Command, Task, TaskType};
use pretty_assertions::assert_eq;

const SAMPLE_CONFIG: &str = r#"
submission:
  job-id: "student_507f1f77"
  file-collector: "https://fileserver.example/v1/"
  log: true
  hw-groups:
    - group1
tasks:
  - task-id: "A.fetch.1"
    priority: 1
    test-id: "A"
    cmd:
      bin: "fetch"
      args: ["in.txt", "${SOURCE_DIR}/A/in.txt"]
  - task-id: "A.compilation.2"
    priority: 1
    fatal-failure: true
    test-id: "A"
    type: "initiation"
    cmd:
      bin: "/usr/bin/gcc"
      args: ["main.c", "-o", "a.out"]
    sandbox:
      name: "isolate"
      limits:
        - hw-group-id: group1
          time: 30.0
          memory: 262144
  - task-id: "A.execution.3"
    priority: 2
    test-id: "A"
    type: "execution"
    cmd:
      bin: "a.out"
    sandbox:
      name: "isolate"
      stdin: "${EVAL_DIR}/A/in.txt"
      stdout: "${EVAL_DIR}/A/out.actual"
      limits:
        - hw-group-id: group1
          time: 2.0
          wall-time: 4.0
          memory: 65536
          environ-variable:
            PATH: /usr/bin
          bound-directories:
            - src: "/var/job"
              dst: "/box"
              mode: "RW"
  - task-id: "A.judge.4"
    priority: 3
    test-id: "A"
    type: "evaluation"
    cmd:
      bin: "/usr/bin/recodex-judge-normal"
      args: ["${EVAL_DIR}/A/out.expected", "${EVAL_DIR}/A/out.actual"]
    sandbox:
      name: "isolate"
      output: true
      limits:
        - hw-group-id: group1
          time: 5.0
"#;

#[test]
fn test_parse_sample_config() {
    let config = JobConfig::from_yaml(SAMPLE_CONFIG).expect("parse");

    assert_eq!(config.submission.job_id.as_str(), "student_507f1f77");
    assert!(config.submission.log);
    assert_eq!(config.submission.hw_groups, vec![HwGroupId::new("group1")]);
    assert_eq!(config.tasks.len(), 4);

    let fetch = &config.tasks[0];
    assert!(fetch.is_internal());
    assert_eq!(fetch.cmd.bin, "fetch");
    assert_eq!(fetch.task_type, None);

    let execution = &config.tasks[2];
    assert!(execution.is_external());
    let sandbox = execution.sandbox.as_ref().unwrap();
    assert_eq!(sandbox.stdin.as_deref(), Some("${EVAL_DIR}/A/in.txt"));
    let limits = sandbox.limits_for(&HwGroupId::new("group1")).unwrap();
    assert_eq!(limits.time, Some(2.0));
    assert_eq!(limits.environ_variable["PATH"], "/usr/bin");
    assert_eq!(limits.bound_directories[0].mode, "RW");
}

#[test]
fn test_sample_config_roundtrip() {
    let config = JobConfig::from_yaml(SAMPLE_CONFIG).expect("parse");
    let yaml = config.to_yaml().expect("serialize");
    let reparsed = JobConfig::from_yaml(&yaml).expect("reparse");

    assert_eq!(reparsed.submission, config.submission);
    assert_eq!(reparsed.tasks, config.tasks);
}

#[test]
fn test_built_config_roundtrip() {
    let mut limits = Limits::new("group1");
    limits.time = Some(1.0);
    limits.disk_size = Some(10240);
    limits.bound_directories.push(BoundDirectory {
        src: "/src".into(),
        dst: "/dst".into(),
        mode: "RW,NOEXEC".into(),
    });

    let mut sandbox = SandboxConfig::new("isolate");
    sandbox.stdout = Some("${EVAL_DIR}/out".into());
    sandbox.output = true;
    sandbox.set_limits(limits);

    let tasks = vec![
        Task::external("t.run.1", 2, Command::new("a.out", vec![]), sandbox)
            .with_test_id("t")
            .with_type(TaskType::Execution),
        Task::internal("t.judge-prep.2", 1, Command::new("mkdir", vec!["d".into()]))
            .with_test_id("t"),
        Task::external(
            "t.judge.3",
            3,
            Command::new("/usr/bin/diff", vec![]),
            SandboxConfig::new("isolate"),
        )
        .with_test_id("t")
        .with_type(TaskType::Evaluation),
    ];
    let header = SubmissionHeader::new("job_1", "https://collector/", vec![HwGroupId::new("group1")]);
    let config = JobConfig::new(header, tasks).expect("valid");

    let yaml = config.to_yaml().expect("serialize");
    let reparsed = JobConfig::from_yaml(&yaml).expect("reparse");
    assert_eq!(reparsed, config);
}

#[test]
fn test_parse_rejects_structurally_invalid_config() {
    // Test "A" has an execution task but no evaluation task
    let input = r#"
submission:
  job-id: "job"
  file-collector: "https://collector/"
  hw-groups: ["g"]
tasks:
  - task-id: "A.execution.1"
    priority: 2
    test-id: "A"
    type: "execution"
    cmd:
      bin: "a.out"
    sandbox:
      name: "isolate"
      limits:
        - hw-group-id: g
          time: 1.0
"#;
    assert!(JobConfig::from_yaml(input).is_err());
}

#[test]
fn test_undefined_limits_roundtrip() {
    let config = JobConfig::from_yaml(SAMPLE_CONFIG).expect("parse");
    let clone = config.clone_without_limits(&HwGroupId::new("group1"));

    let yaml = clone.to_yaml().expect("serialize");
    let reparsed = JobConfig::from_yaml(&yaml).expect("reparse");

    let execution = &reparsed.tasks[2];
    let limits = execution
        .sandbox
        .as_ref()
        .unwrap()
        .limits_for(&HwGroupId::new("group1"))
        .unwrap();
    assert!(limits.is_undefined());
}

#[test]
fn test_overrides_survive_roundtrip() {
    let config = JobConfig::from_yaml(SAMPLE_CONFIG).expect("parse");

    let mut override_limits = Limits::new("group1");
    override_limits.memory = Some(131072);
    let overrides = std::collections::HashMap::from([(TestId::new("A"), override_limits)]);

    let clone = config.clone_with_new_limits(&HwGroupId::new("group1"), &overrides);
    let reparsed = JobConfig::from_yaml(&clone.to_yaml().unwrap()).unwrap();

    let limits = reparsed.tasks[2]
        .sandbox
        .as_ref()
        .unwrap()
        .limits_for(&HwGroupId::new("group1"))
        .unwrap()
        .clone();
    assert_eq!(limits.memory, Some(131072));
    // Merged baseline fields kept
    assert_eq!(limits.time, Some(2.0));
}
