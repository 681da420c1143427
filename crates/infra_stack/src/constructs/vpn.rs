//! Certificate-authenticated remote access into the network.

use serde_json::json;
use tracing::info;

use crate::config::VpnConfig;
use crate::constructs::network::NetworkHandle;
use crate::constructs::security_group::{create_security_group, Egress, SecurityGroupHandle};
use crate::error::StackResult;
use crate::resource::{LogicalId, Resource};
use crate::stack::Stack;
use crate::token::Token;

const ROOT_CA_TEMPLATE_ARN: &str = "arn:aws:acm-pca:::template/RootCACertificate/V1";

#[derive(Debug, Clone)]
pub struct RemoteAccessHandle {
    pub certificate_authority: LogicalId,
    pub activation: LogicalId,
    pub server_certificate: LogicalId,
    pub client_certificate: LogicalId,
    pub endpoint: LogicalId,
    pub security_group: SecurityGroupHandle,
    pub association: LogicalId,
    pub authorization: LogicalId,
}

impl RemoteAccessHandle {
    pub fn endpoint_id(&self) -> Token {
        self.endpoint.reference()
    }
}

/// Declare a private root CA, a server/client certificate pair issued by it,
/// and a split-tunnel client VPN endpoint associated with the first private
/// subnet.
pub fn create_remote_access(
    stack: &mut Stack,
    network: &NetworkHandle,
    config: &VpnConfig,
) -> StackResult<RemoteAccessHandle> {
    let ca = stack.add(
        "VpnPrivateCA",
        Resource::new("AWS::ACMPCA::CertificateAuthority")
            .prop("KeyAlgorithm", config.key_algorithm.as_str())
            .prop("SigningAlgorithm", config.signing_algorithm.as_str())
            .prop(
                "Subject",
                json!({
                    "CommonName": config.subject.common_name,
                    "Country": config.subject.country,
                    "Organization": config.subject.organization,
                    "OrganizationalUnit": config.subject.organizational_unit
                }),
            )
            .prop("Type", "ROOT"),
    )?;

    let ca_certificate = stack.add(
        "VpnPrivateCACertificate",
        Resource::new("AWS::ACMPCA::Certificate")
            .prop("CertificateAuthorityArn", ca.att("Arn"))
            .prop("CertificateSigningRequest", ca.att("CertificateSigningRequest"))
            .prop("SigningAlgorithm", config.signing_algorithm.as_str())
            .prop("TemplateArn", ROOT_CA_TEMPLATE_ARN)
            .prop("Validity", json!({ "Type": "YEARS", "Value": config.ca_validity_years })),
    )?;

    let activation = stack.add(
        "VpnPrivateCAActivation",
        Resource::new("AWS::ACMPCA::CertificateAuthorityActivation")
            .prop("Certificate", ca_certificate.att("Certificate"))
            .prop("CertificateAuthorityArn", ca.att("Arn"))
            .prop("Status", "ACTIVE"),
    )?;

    // Both certificates are private and can only be issued once the CA is active.
    let issue = |domain: &str| {
        Resource::new("AWS::CertificateManager::Certificate")
            .prop("CertificateAuthorityArn", ca.att("Arn"))
            .prop("DomainName", domain)
            .depends_on(&activation)
    };
    let server_certificate = stack.add("VpnServerCert", issue(&config.server_domain))?;
    let client_certificate = stack.add("VpnClientCert", issue(&config.client_domain))?;

    let security_group = create_security_group(
        stack,
        "VpnSG",
        network,
        "SG for VPN Connections",
        Egress::AllowAll,
    )?;

    let endpoint = stack.add(
        "ClientVpnEndpoint",
        Resource::new("AWS::EC2::ClientVpnEndpoint")
            .prop(
                "AuthenticationOptions",
                json!([{
                    "MutualAuthentication": {
                        "ClientRootCertificateChainArn": client_certificate.reference()
                    },
                    "Type": "certificate-authentication"
                }]),
            )
            .prop("ClientCidrBlock", config.client_cidr.as_str())
            .prop("ConnectionLogOptions", json!({ "Enabled": false }))
            .prop("SecurityGroupIds", vec![security_group.group_id().to_value()])
            .prop("ServerCertificateArn", server_certificate.reference())
            .prop("SplitTunnel", config.split_tunnel)
            .prop("TransportProtocol", config.transport_protocol.as_str())
            .prop("VpcId", network.vpc_id()),
    )?;

    let association = stack.add(
        "VpnAssociation",
        Resource::new("AWS::EC2::ClientVpnTargetNetworkAssociation")
            .prop("ClientVpnEndpointId", endpoint.reference())
            .prop("SubnetId", network.first_private_subnet()?.subnet_id()),
    )?;

    let authorization = stack.add(
        "VpnAuthRule",
        Resource::new("AWS::EC2::ClientVpnAuthorizationRule")
            .prop("AuthorizeAllGroups", true)
            .prop("ClientVpnEndpointId", endpoint.reference())
            .prop("TargetNetworkCidr", network.cidr_block()),
    )?;

    info!(
        "Remote access endpoint declared (client range {}, split tunnel: {})",
        config.client_cidr, config.split_tunnel
    );

    Ok(RemoteAccessHandle {
        certificate_authority: ca,
        activation,
        server_certificate,
        client_certificate,
        endpoint,
        security_group,
        association,
        authorization,
    })
}
