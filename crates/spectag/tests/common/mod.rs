//! Common test utilities.

#![allow(dead_code)]

use std::path::Path;

/// A small knowledge base in `pyspec.json` form
pub const PYSPEC: &str = r#"{
  "mainnet": {
    "capella": {
      "ssz_objects": {
        "Withdrawal": "class Withdrawal(Container):\n    index: WithdrawalIndex\n    amount: Gwei\n"
      }
    },
    "deneb": {
      "ssz_objects": {
        "Withdrawal": "class Withdrawal(Container):\n    index: WithdrawalIndex\n    amount: Gwei\n"
      },
      "functions": {
        "get_balance": "def get_balance(state: BeaconState, index: ValidatorIndex) -> Gwei:\n    return state.balances[index]\n"
      },
      "constant_vars": {
        "GENESIS_SLOT": ["Slot", "Slot(0)"]
      },
      "custom_types": {
        "Gwei": "uint64"
      }
    },
    "electra": {
      "ssz_objects": {
        "Withdrawal": "class Withdrawal(Container):\n    index: WithdrawalIndex\n    # [New in Electra]\n    validator_index: ValidatorIndex\n    amount: Gwei\n"
      },
      "functions": {
        "get_balance": "def get_balance(state: BeaconState, index: ValidatorIndex) -> Gwei:\n    return state.balances[index]\n"
      }
    }
  }
}"#;

/// Source file with one tag of each interesting kind
pub const SOURCE: &str = r#"// <spec fn="get_balance" fork="electra"></spec>
pub fn get_balance() {}

// <spec ssz_object="Withdrawal" fork="electra" style="diff"></spec>
pub struct Withdrawal;
"#;

/// Write a knowledge base for `version` under `<root>/pyspec`
pub fn write_knowledge_base(root: &Path, version: &str) {
    let dir = root.join("pyspec").join(version);
    std::fs::create_dir_all(&dir).expect("Failed to create knowledge base dir");
    std::fs::write(dir.join("pyspec.json"), PYSPEC).expect("Failed to write pyspec.json");
}

/// Create a temporary project with a knowledge base and one tagged file.
pub fn create_temp_project() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("Failed to create temp dir");
    write_knowledge_base(temp.path(), "nightly");

    std::fs::create_dir_all(temp.path().join("src")).expect("Failed to create src dir");
    std::fs::write(temp.path().join("src/lib.rs"), SOURCE).expect("Failed to write lib.rs");

    temp
}
