//! Operation registry.
//!
//! Every operation the chain knows is a variant of [`Operation`] with a
//! fixed id and field order. The JSON form is `["name", {fields}]`; the
//! binary form is `varint(id)` followed by the fields.
//!
//! Ids 29 and up are virtual operations: the node emits them in block
//! history but never accepts them in a transaction.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::crypto::PublicKey;
use crate::error::EncodingError;
use crate::serializer::{
    impl_encode_fields, Asset, Authority, ByteBuffer, Bytes, ChainProperties, Encode, LuaValue,
    StaticVariant,
};

/// First id of the node-emitted operations.
const FIRST_VIRTUAL_ID: u16 = 29;

macro_rules! operations {
    ($(
        $id:literal => $variant:ident($name:literal) $op:ident {
            $( $(#[$attr:meta])* $field:ident : $ty:ty ),* $(,)?
        }
    ),* $(,)?) => {
        $(
            #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
            pub struct $op {
                $( $(#[$attr])* pub $field: $ty, )*
            }

            impl_encode_fields!($op { $($field),* });

            impl From<$op> for Operation {
                fn from(op: $op) -> Self {
                    Operation::$variant(op)
                }
            }
        )*

        /// A chain operation.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Operation {
            $( $variant($op), )*
        }

        impl Operation {
            /// Operation names indexed by id.
            pub const NAMES: &'static [&'static str] = &[$($name),*];

            pub fn id(&self) -> u16 {
                match self {
                    $( Operation::$variant(_) => $id, )*
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $( Operation::$variant(_) => $name, )*
                }
            }

            pub fn id_of(name: &str) -> Option<u16> {
                match name {
                    $( $name => Some($id), )*
                    _ => None,
                }
            }

            /// Build an operation from its name and JSON field object.
            pub fn from_parts(name: &str, fields: Value) -> Result<Self, EncodingError> {
                let invalid = |e: serde_json::Error| EncodingError::InvalidField {
                    path: name.to_string(),
                    message: e.to_string(),
                };
                match name {
                    $( $name => serde_json::from_value::<$op>(fields).map(Operation::$variant).map_err(invalid), )*
                    _ => Err(EncodingError::UnknownOperation { name: name.to_string() }),
                }
            }

            fn encode_fields(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
                match self {
                    $( Operation::$variant(op) => op.encode(buf), )*
                }
            }

            fn serialize_pair<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match self {
                    $( Operation::$variant(op) => ($name, op).serialize(serializer), )*
                }
            }
        }
    };
}

operations! {
    0 => AccountCreate("account_create") AccountCreateOperation {
        fee: Asset,
        creator: String,
        new_account_name: String,
        owner: Authority,
        active: Authority,
        posting: Authority,
        memo_key: PublicKey,
        json_metadata: String,
    },
    1 => AccountUpdate("account_update") AccountUpdateOperation {
        account: String,
        owner: Option<Authority>,
        active: Option<Authority>,
        posting: Option<Authority>,
        memo_key: PublicKey,
        json_metadata: String,
    },
    2 => Transfer("transfer") TransferOperation {
        from: String,
        to: String,
        amount: Asset,
        memo: String,
    },
    3 => TransferToQi("transfer_to_qi") TransferToQiOperation {
        from: String,
        to: String,
        amount: Asset,
    },
    4 => WithdrawQi("withdraw_qi") WithdrawQiOperation {
        account: String,
        qi: Asset,
    },
    5 => SetWithdrawQiRoute("set_withdraw_qi_route") SetWithdrawQiRouteOperation {
        from_account: String,
        to_account: String,
        percent: u16,
        auto_vest: bool,
    },
    6 => DelegateQi("delegate_qi") DelegateQiOperation {
        delegator: String,
        delegatee: String,
        qi: Asset,
    },
    7 => SimingUpdate("siming_update") SimingUpdateOperation {
        owner: String,
        url: String,
        block_signing_key: PublicKey,
        props: ChainProperties,
        fee: Asset,
    },
    8 => SimingSetProperties("siming_set_properties") SimingSetPropertiesOperation {
        owner: String,
        props: Vec<(String, Bytes)>,
        #[serde(default)]
        extensions: Vec<String>,
    },
    9 => AccountSimingAdore("account_siming_adore") AccountSimingAdoreOperation {
        account: String,
        siming: String,
        approve: bool,
    },
    10 => AccountSimingProxy("account_siming_proxy") AccountSimingProxyOperation {
        account: String,
        proxy: String,
    },
    11 => DeclineAdoringRights("decline_adoring_rights") DeclineAdoringRightsOperation {
        account: String,
        decline: bool,
    },
    12 => Custom("custom") CustomOperation {
        required_auths: Vec<String>,
        id: u16,
        data: Bytes,
    },
    13 => CustomJson("custom_json") CustomJsonOperation {
        required_auths: Vec<String>,
        required_posting_auths: Vec<String>,
        id: String,
        json: String,
    },
    14 => RequestAccountRecovery("request_account_recovery") RequestAccountRecoveryOperation {
        recovery_account: String,
        account_to_recover: String,
        new_owner_authority: Authority,
        #[serde(default)]
        extensions: Vec<String>,
    },
    15 => RecoverAccount("recover_account") RecoverAccountOperation {
        account_to_recover: String,
        new_owner_authority: Authority,
        recent_owner_authority: Authority,
        #[serde(default)]
        extensions: Vec<String>,
    },
    16 => ChangeRecoveryAccount("change_recovery_account") ChangeRecoveryAccountOperation {
        account_to_recover: String,
        new_recovery_account: String,
        #[serde(default)]
        extensions: Vec<String>,
    },
    17 => ClaimRewardBalance("claim_reward_balance") ClaimRewardBalanceOperation {
        account: String,
        reward_yang: Asset,
        reward_qi: Asset,
        reward_feigang: Asset,
    },
    18 => CreateContract("create_contract") CreateContractOperation {
        owner: String,
        name: String,
        data: String,
        contract_authority: PublicKey,
        #[serde(default)]
        extensions: Vec<String>,
    },
    19 => ReviseContract("revise_contract") ReviseContractOperation {
        reviser: String,
        contract_name: String,
        data: String,
        #[serde(default)]
        extensions: Vec<String>,
    },
    20 => CallContractFunction("call_contract_function") CallContractFunctionOperation {
        caller: String,
        creator: String,
        contract_name: String,
        function_name: String,
        value_list: Vec<LuaValue>,
        #[serde(default)]
        extensions: Vec<String>,
    },
    21 => CreateNfaSymbol("create_nfa_symbol") CreateNfaSymbolOperation {
        creator: String,
        symbol: String,
        describe: String,
        default_contract: String,
    },
    22 => CreateNfa("create_nfa") CreateNfaOperation {
        creator: String,
        symbol: String,
    },
    23 => TransferNfa("transfer_nfa") TransferNfaOperation {
        from: String,
        to: String,
        id: i64,
    },
    24 => ApproveNfaActive("approve_nfa_active") ApproveNfaActiveOperation {
        owner: String,
        active_account: String,
        id: i64,
    },
    25 => ActionNfa("action_nfa") ActionNfaOperation {
        caller: String,
        id: i64,
        action: String,
        value_list: Vec<LuaValue>,
        #[serde(default)]
        extensions: Vec<String>,
    },
    26 => CreateZone("create_zone") CreateZoneOperation {
        fee: Asset,
        creator: String,
        name: String,
    },
    27 => CreateActorTalentRule("create_actor_talent_rule") CreateActorTalentRuleOperation {
        creator: String,
        contract: String,
    },
    28 => CreateActor("create_actor") CreateActorOperation {
        fee: Asset,
        creator: String,
        family_name: String,
        last_name: String,
    },
    29 => Hardfork("hardfork") HardforkOperation {
        hardfork_id: u32,
    },
    30 => FillQiWithdraw("fill_qi_withdraw") FillQiWithdrawOperation {
        from_account: String,
        to_account: String,
        withdrawn: Asset,
        deposited: Asset,
    },
    31 => ReturnQiDelegation("return_qi_delegation") ReturnQiDelegationOperation {
        account: String,
        qi: Asset,
    },
    32 => ProducerReward("producer_reward") ProducerRewardOperation {
        producer: String,
        qi: Asset,
    },
    33 => Reward("reward") RewardOperation {
        account: String,
        reward: Asset,
    },
    34 => NfaConvertResources("nfa_convert_resources") NfaConvertResourcesOperation {
        nfa: i64,
        owner: String,
        qi: Asset,
        resource: Asset,
        is_qi_to_resource: bool,
    },
    35 => NfaTransfer("nfa_transfer") NfaTransferOperation {
        from: i64,
        from_owner: String,
        to: i64,
        to_owner: String,
        amount: Asset,
    },
    36 => NfaDepositWithdraw("nfa_deposit_withdraw") NfaDepositWithdrawOperation {
        nfa: i64,
        account: String,
        deposited: Asset,
        withdrawn: Asset,
    },
    37 => RewardFeigang("reward_feigang") RewardFeigangOperation {
        account: String,
        qi: Asset,
    },
    38 => TiandaoYearChange("tiandao_year_change") TiandaoYearChangeOperation {
        messager: String,
        years: u32,
        months: u32,
        times: u32,
        live_num: u32,
        dead_num: u32,
        born_this_year: u32,
        dead_this_year: u32,
    },
    39 => TiandaoMonthChange("tiandao_month_change") TiandaoMonthChangeOperation {
        messager: String,
        years: u32,
        months: u32,
        times: u32,
    },
    40 => TiandaoTimeChange("tiandao_time_change") TiandaoTimeChangeOperation {
        messager: String,
        years: u32,
        months: u32,
        times: u32,
    },
    41 => ActorBorn("actor_born") ActorBornOperation {
        owner: String,
        name: String,
        zone: String,
        nfa: i64,
    },
    42 => ActorTalentTrigger("actor_talent_trigger") ActorTalentTriggerOperation {
        owner: String,
        name: String,
        nfa: i64,
        tid: i64,
        title: String,
        desc: String,
        age: i32,
    },
    43 => ActorMovement("actor_movement") ActorMovementOperation {
        owner: String,
        name: String,
        from_zone: String,
        to_zone: String,
        nfa: i64,
    },
    44 => ActorGrown("actor_grown") ActorGrownOperation {
        owner: String,
        name: String,
        nfa: i64,
        years: u32,
        months: u32,
        times: u32,
        age: i32,
        health: i32,
    },
    45 => NarrateLog("narrate_log") NarrateLogOperation {
        narrator: String,
        nfa: i64,
        years: u32,
        months: u32,
        times: u32,
        log: String,
    },
}

impl Operation {
    /// Whether only the node may produce this operation.
    pub fn is_virtual(&self) -> bool {
        self.id() >= FIRST_VIRTUAL_ID
    }
}

impl StaticVariant for Operation {
    fn variant_index(&self) -> u64 {
        u64::from(self.id())
    }

    fn encode_payload(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        self.encode_fields(buf).map_err(|e| e.at(self.name()))
    }
}

impl Encode for Operation {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        self.encode_variant(buf)
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.serialize_pair(serializer)
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (name, fields) = <(String, Value)>::deserialize(deserializer)?;
        Operation::from_parts(&name, fields).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::to_hex;
    use serde_json::json;

    fn transfer() -> Operation {
        TransferOperation {
            from: "initminer".into(),
            to: "initminer".into(),
            amount: "1.000000 QI".parse().unwrap(),
            memo: "test".into(),
        }
        .into()
    }

    #[test]
    fn test_transfer_golden() {
        assert_eq!(
            to_hex(&transfer()).unwrap(),
            "0209696e69746d696e657209696e69746d696e657240420f000000000006514900000000000474657374"
        );
    }

    #[test]
    fn test_custom_json_golden() {
        let op = Operation::from_parts(
            "custom_json",
            json!({
                "required_auths": [],
                "required_posting_auths": ["alice"],
                "id": "follow",
                "json": "{\"a\":1}"
            }),
        )
        .unwrap();
        assert_eq!(
            to_hex(&op).unwrap(),
            "0d000105616c69636506666f6c6c6f77077b2261223a317d"
        );
    }

    #[test]
    fn test_qi_operations_golden() {
        let op: Operation = TransferToQiOperation {
            from: "alice".into(),
            to: "bob".into(),
            amount: "12.345 YANG".parse().unwrap(),
        }
        .into();
        assert_eq!(
            to_hex(&op).unwrap(),
            "0305616c69636503626f6239300000000000000359414e47000000"
        );

        let op: Operation = DelegateQiOperation {
            delegator: "alice".into(),
            delegatee: "bob".into(),
            qi: "1.500000 QI".parse().unwrap(),
        }
        .into();
        assert_eq!(
            to_hex(&op).unwrap(),
            "0605616c69636503626f6260e31600000000000651490000000000"
        );
    }

    #[test]
    fn test_adore_golden() {
        let op: Operation = AccountSimingAdoreOperation {
            account: "alice".into(),
            siming: "initminer".into(),
            approve: true,
        }
        .into();
        assert_eq!(
            to_hex(&op).unwrap(),
            "0905616c69636509696e69746d696e657201"
        );
    }

    #[test]
    fn test_account_update_null_memo_key() {
        let op = Operation::from_parts(
            "account_update",
            json!({
                "account": "alice",
                "memo_key": "TAI1111111111111111111111111111111114T1Anm",
                "json_metadata": ""
            }),
        )
        .unwrap();
        let expected = format!("0105616c696365000000{}00", "00".repeat(33));
        assert_eq!(to_hex(&op).unwrap(), expected);
    }

    #[test]
    fn test_json_shape_round_trip() {
        let value = serde_json::to_value(transfer()).unwrap();
        assert_eq!(
            value,
            json!(["transfer", {"from": "initminer", "to": "initminer", "amount": "1.000000 QI", "memo": "test"}])
        );
        let back: Operation = serde_json::from_value(value).unwrap();
        assert_eq!(back, transfer());
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let err = Operation::from_parts("pow2", json!({})).unwrap_err();
        assert_eq!(
            err,
            EncodingError::UnknownOperation {
                name: "pow2".into()
            }
        );
        assert!(serde_json::from_value::<Operation>(json!(["pow2", {}]))
            .unwrap_err()
            .to_string()
            .contains("pow2"));
    }

    #[test]
    fn test_missing_field_names_operation() {
        let err = Operation::from_parts("transfer", json!({"from": "a"})).unwrap_err();
        assert_eq!(err.path(), Some("transfer"));
    }

    #[test]
    fn test_encode_error_carries_path() {
        let op: Operation = TransferOperation {
            from: "a".into(),
            to: "b".into(),
            amount: "1.000 TOOLONGSYM".parse().unwrap(),
            memo: String::new(),
        }
        .into();
        assert_eq!(to_hex(&op).unwrap_err().path(), Some("transfer.amount"));
    }

    #[test]
    fn test_registry_ids_are_dense() {
        assert_eq!(Operation::NAMES.len(), 46);
        for (index, name) in Operation::NAMES.iter().enumerate() {
            assert_eq!(Operation::id_of(name), Some(index as u16), "{name}");
        }
        assert!(transfer().id() < FIRST_VIRTUAL_ID);
        assert!(!transfer().is_virtual());
        assert!(Operation::Hardfork(HardforkOperation { hardfork_id: 1 }).is_virtual());
    }

    #[test]
    fn test_contract_call_with_lua_values() {
        let op = Operation::from_parts(
            "call_contract_function",
            json!({
                "caller": "alice",
                "creator": "bob",
                "contract_name": "contract.game",
                "function_name": "move",
                "value_list": [{"type": "int", "value": 3}, {"type": "nil"}]
            }),
        )
        .unwrap();
        let hex = to_hex(&op).unwrap();
        assert!(hex.starts_with("14"));
        // two values (int 3, nil) then empty extensions
        assert!(hex.ends_with("020203000000000000000000"));
    }
}
